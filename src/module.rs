//! The module contract implemented by application components.
//!
//! A module declares the [`Data`]( crate::Data ) it **produces** and **consumes**
//! and wires itself up in [`Module::configure`]. The [`Assembly`]( crate::Assembly )
//! uses the declarations to decide when a module is ready: a module is configured
//! only once every key it consumes has been produced.

use std::fmt ;
use std::sync::Arc ;

use crate::{ Binder, DataKeys };



/// Error type returned by [`Module::configure`].
///
/// Boxed so that modules can `?` both crate errors and their own.
pub type ModuleError = Box<dyn std::error::Error + Send + Sync>;

/// Whether a module may be installed more than once.
#[derive( Copy, Clone, Debug, PartialEq, Eq, Hash, Default )]
pub enum Capability {
    /// Installing a second module with the same signature is an error.
    #[default] Plain,
    /// Redundant installation is silently ignored.
    ///
    /// Use this for shared dependencies that several modules install on their own.
    Repeatable,
}

/// A self-describing component of an application.
///
/// [`name`]( Self::name ), [`namespace`]( Self::namespace ), [`produces`]( Self::produces )
/// and [`consumes`]( Self::consumes ) must return the same values every time they are
/// called on the same instance. [`configure`]( Self::configure ) may only touch the keys
/// declared by `produces` and `consumes`, and must [`put`]( crate::Data::put ) every
/// produced key before returning.
///
/// ```
/// use modbind::{ Assembly, Binder, Data, DataKeys, Module, ModuleError, keys };
/// use std::sync::Arc ;
///
/// static GREETING: Data<String> = Data::new( module_path!(), "greeting" );
///
/// struct Greeter ;
/// impl Module for Greeter {
///     fn namespace( &self ) -> &str { module_path!() }
///     fn name( &self ) -> &str { "greeter" }
///     fn produces( &self ) -> DataKeys { keys![ GREETING ] }
///     fn configure( &self, binder: &Binder<'_> ) -> Result<(), ModuleError> {
///         GREETING.put( binder, "hello".to_string() )?;
///         Ok(())
///     }
/// }
///
/// let assembly = Assembly::new([ Arc::new( Greeter ) as Arc<dyn Module> ]).unwrap();
/// assembly.build().unwrap();
/// assert_eq!( GREETING.get( &assembly ).unwrap(), "hello" );
/// ```
pub trait Module: Send + Sync {

    /// Namespace the module belongs to, usually `module_path!()`.
    fn namespace( &self ) -> &str ;

    /// Name of the module, unique within its namespace.
    fn name( &self ) -> &str ;

    /// Keys this module writes during configuration.
    fn produces( &self ) -> DataKeys { DataKeys::new() }

    /// Keys this module reads during configuration.
    fn consumes( &self ) -> DataKeys { DataKeys::new() }

    /// Whether the module tolerates redundant installation.
    fn capability( &self ) -> Capability { Capability::Plain }

    /// Wires up the module.
    ///
    /// Called once, after every consumed key has a value. The binder is only valid
    /// for the duration of this call.
    ///
    /// # Errors
    /// Any error halts the build.
    fn configure( &self, binder: &Binder<'_> ) -> Result<(), ModuleError> ;

}

impl<M: Module + ?Sized> Module for Arc<M> {
    fn namespace( &self ) -> &str { ( **self ).namespace() }
    fn name( &self ) -> &str { ( **self ).name() }
    fn produces( &self ) -> DataKeys { ( **self ).produces() }
    fn consumes( &self ) -> DataKeys { ( **self ).consumes() }
    fn capability( &self ) -> Capability { ( **self ).capability() }
    fn configure( &self, binder: &Binder<'_> ) -> Result<(), ModuleError> { ( **self ).configure( binder ) }
}

/// The `( namespace, name )` identity of a module.
///
/// Two modules with equal signatures are the same module as far as an
/// [`Assembly`]( crate::Assembly ) is concerned, whatever their concrete type.
#[derive( Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord )]
pub struct ModuleSignature {
    namespace: String,
    name: String,
}

impl ModuleSignature {
    /// Creates a module signature.
    pub fn new( namespace: impl Into<String>, name: impl Into<String> ) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }

    /// Computes the signature of `module`.
    pub fn of( module: &( impl Module + ?Sized )) -> Self {
        Self::new( module.namespace(), module.name() )
    }

    /// The module's namespace.
    #[inline] pub fn namespace( &self ) -> &str { &self.namespace }

    /// The module's name.
    #[inline] pub fn name( &self ) -> &str { &self.name }
}

impl fmt::Display for ModuleSignature {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        write!( f, "{}:{}", self.namespace, self.name )
    }
}
