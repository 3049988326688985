//! The facade a module configures itself through.
//!
//! A [`Binder`] is handed to [`Module::configure`] and is valid only for the
//! duration of that call. It checks every access against the module's
//! declarations, remembers the first failure, and refuses further work once
//! something has gone wrong so that a module cannot hide an error by ignoring
//! a return value.

use std::sync::Arc ;
use parking_lot::Mutex ;
use tracing::{ debug, trace };

use crate::{ Assembly, Error, Module, ModuleSignature };
use crate::binding::{ Binding, Phase };
use crate::data::{ DataKey, DataReader, DataWriter, KeyRef, Value };
use crate::error::{ ConfigurationError, Declaration, Operation };
use crate::utils::non_empty ;



/// Per-module access to the [`Assembly`] during configuration.
///
/// Modules read and write data through [`Data::get`]( crate::Data::get ) and
/// [`Data::put`]( crate::Data::put ), passing the binder along, and may add
/// further modules with [`install`]( Self::install ).
///
/// Every operation fails with [`Error::OutsideConfiguration`] unless the module's
/// `configure` call is in progress. After the first failed operation, every later
/// operation fails with [`Error::FailFast`], and the build reports the first failure
/// regardless of what `configure` returns.
pub struct Binder<'a> {
    assembly: &'a Assembly,
    binding: Arc<Binding>,
    first_error: Mutex<Option<Error>>,
}

impl<'a> Binder<'a> {

    pub(crate) fn new( assembly: &'a Assembly, binding: Arc<Binding> ) -> Self {
        Self { assembly, binding, first_error: Mutex::new( None )}
    }

    /// Signature of the module being configured.
    #[inline] pub fn signature( &self ) -> &ModuleSignature { self.binding.signature() }

    /// Installs another module into the assembly.
    ///
    /// The new module is configured later in the same build, once its own
    /// dependencies are met.
    ///
    /// # Errors
    /// Fails outside of configuration, after an earlier failure, or if the module
    /// cannot be installed (see [`Assembly::install`]).
    pub fn install( &self, module: Arc<dyn Module> ) -> Result<(), Error> {
        self.guarded( Operation::Install, || self.assembly.install_with_parent( module, Some( self.signature() )))
    }

    /// The first error any operation on this binder has produced, if any.
    pub fn configuration_error( &self ) -> Option<Error> { self.first_error.lock().clone() }

    /// Runs the module's `configure` with this binder. Can succeed at most once.
    pub(crate) fn configure_module( &self ) -> Result<(), Error> {

        if !self.binding.transition( Phase::Installed, Phase::Configuring ) {
            return Err( Error::AlreadyConfigured );
        }

        debug!( target: "modbind::binder", module = %self.signature(), "Configuring module" );
        let returned = self.binding.module().configure( self );

        let result = match ( self.configuration_error(), returned ) {
            ( Some( first ), _ ) => Err( first ),
            ( Option::None, Err( err )) => Err( self.track( Operation::Configure, match err.downcast::<Error>() {
                Ok( err ) => *err,
                Err( err ) => Error::Module( Arc::from( err )),
            })),
            ( Option::None, Ok(())) => match non_empty( self.binding.unproduced().into_iter().map( KeyRef::signature )) {
                Some( missing ) => Err( self.track( Operation::Configure, Error::NotProduced( missing ))),
                Option::None => Ok(()),
            },
        };

        let next = match result.is_ok() { true => Phase::Configured, false => Phase::Failed };
        self.binding.transition( Phase::Configuring, next );
        debug!( target: "modbind::binder", module = %self.signature(), phase = ?next, "Finished configuring module" );
        result

    }

    fn guarded<T>( &self, operation: Operation, run: impl FnOnce() -> Result<T, Error> ) -> Result<T, Error> {
        if self.binding.phase() != Phase::Configuring {
            return Err( Error::OutsideConfiguration( operation ));
        }
        if let Some( previous ) = self.configuration_error() {
            return Err( Error::FailFast { operation, previous: Box::new( previous )});
        }
        run().map_err(| source | self.track( operation, source ))
    }

    /// Wraps `source` with this module's context and records it if it is the first failure.
    fn track( &self, operation: Operation, source: Error ) -> Error {
        let err = Error::from( ConfigurationError { module: self.signature().clone(), operation, source });
        let mut first = self.first_error.lock();
        if first.is_none() {
            debug!( target: "modbind::binder", module = %self.signature(), %operation, error = %err, "Recorded first configuration error" );
            *first = Some( err.clone() );
        }
        err
    }

}

impl DataReader for Binder<'_> {
    fn get_data( &self, key: &'static dyn DataKey ) -> Result<Value, Error> {
        self.guarded( Operation::Get, || {
            let key = KeyRef( key );
            if !self.binding.consumes().contains( &key ) {
                return Err( Error::UndeclaredKey {
                    module: self.signature().clone(),
                    key: key.signature(),
                    declaration: Declaration::Consumes,
                });
            }
            let value = self.assembly.get_data_value( key )?;
            key.check_payload( &value )?;
            Ok( value )
        })
    }
}

impl DataWriter for Binder<'_> {
    fn put_data( &self, key: &'static dyn DataKey, value: Value ) -> Result<(), Error> {
        self.guarded( Operation::Put, || {
            let key = KeyRef( key );
            if !self.binding.produces().contains( &key ) {
                return Err( Error::UndeclaredKey {
                    module: self.signature().clone(),
                    key: key.signature(),
                    declaration: Declaration::Produces,
                });
            }
            key.check_payload( &value )?;
            self.assembly.put_data_value( key, value )?;
            self.binding.mark_produced( key );
            trace!( target: "modbind::binder", module = %self.signature(), %key, "Produced value" );
            Ok(())
        })
    }
}

impl std::fmt::Debug for Binder<'_> {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "Binder" )
            .field( "binding", &self.binding )
            .field( "first_error", &*self.first_error.lock() )
            .finish_non_exhaustive()
    }
}

#[cfg( test )]
mod tests {
    use super::* ;
    use crate::{ Data, DataKeys, ModuleError, keys };

    static PRODUCED: Data<String> = Data::new( "modbind::binder", "produced" );
    static CONSUMED: Data<i32> = Data::new( "modbind::binder", "consumed" );

    type Configure = fn( &Binder<'_> ) -> Result<(), ModuleError>;

    struct Scripted { name: &'static str, produces: DataKeys, consumes: DataKeys, configure: Configure }
    impl Module for Scripted {
        fn namespace( &self ) -> &str { "modbind::binder" }
        fn name( &self ) -> &str { self.name }
        fn produces( &self ) -> DataKeys { self.produces.clone() }
        fn consumes( &self ) -> DataKeys { self.consumes.clone() }
        fn configure( &self, binder: &Binder<'_> ) -> Result<(), ModuleError> { ( self.configure )( binder ) }
    }

    fn scripted( name: &'static str, produces: DataKeys, consumes: DataKeys, configure: Configure ) -> Arc<dyn Module> {
        Arc::new( Scripted { name, produces, consumes, configure })
    }

    fn binding_of( assembly: &Assembly, name: &str ) -> Arc<Binding> {
        assembly.binding( &ModuleSignature::new( "modbind::binder", name )).unwrap()
    }

    #[test]
    fn operations_fail_outside_configuration() {
        let assembly = Assembly::new([ scripted( "idle", keys![ PRODUCED ], keys![ CONSUMED ], | _ | Ok(()) )]).unwrap();
        assembly.put_data_value( KeyRef( &CONSUMED ), Arc::new( 42 )).unwrap();
        let binder = Binder::new( &assembly, binding_of( &assembly, "idle" ));

        assert!( matches!( binder.install( scripted( "other", keys![], keys![], | _ | Ok(()) )), Err( Error::OutsideConfiguration( Operation::Install ))));
        assert!( matches!( CONSUMED.get( &binder ), Err( Error::OutsideConfiguration( Operation::Get ))));
        assert!( matches!( PRODUCED.put( &binder, "value".into() ), Err( Error::OutsideConfiguration( Operation::Put ))));
        assert_eq!( assembly.modules().len(), 1 );
        assert!( binder.configuration_error().is_none() );
    }

    #[test]
    fn operations_fail_after_configuration() {
        let assembly = Assembly::new([ scripted( "done", keys![], keys![], | _ | Ok(()) )]).unwrap();
        let binder = Binder::new( &assembly, binding_of( &assembly, "done" ));
        binder.configure_module().unwrap();
        assert!( matches!( binder.install( scripted( "late", keys![], keys![], | _ | Ok(()) )), Err( Error::OutsideConfiguration( _ ))));
    }

    #[test]
    fn configure_module_runs_once() {
        let assembly = Assembly::new([ scripted( "once", keys![], keys![], | _ | Ok(()) )]).unwrap();
        let binder = Binder::new( &assembly, binding_of( &assembly, "once" ));
        binder.configure_module().unwrap();
        assert!( matches!( binder.configure_module(), Err( Error::AlreadyConfigured )));
        let again = Binder::new( &assembly, binding_of( &assembly, "once" ));
        assert!( matches!( again.configure_module(), Err( Error::AlreadyConfigured )));
    }

    #[test]
    fn put_records_produced_value() {
        let assembly = Assembly::new([ scripted( "writer", keys![ PRODUCED ], keys![], | binder | {
            PRODUCED.put( binder, "produced".into() )?;
            Ok(())
        })]).unwrap();
        let binder = Binder::new( &assembly, binding_of( &assembly, "writer" ));
        binder.configure_module().unwrap();
        assert!( binder.configuration_error().is_none() );

        let stored = assembly.get_data_value( KeyRef( &PRODUCED )).unwrap();
        assert_eq!( stored.downcast_ref::<String>().map( String::as_str ), Some( "produced" ));
    }

    #[test]
    fn undeclared_put_does_not_reach_store() {
        let assembly = Assembly::new([ scripted( "sneaky", keys![], keys![], | binder | {
            PRODUCED.put( binder, "oops".into() )?;
            Ok(())
        })]).unwrap();
        let binder = Binder::new( &assembly, binding_of( &assembly, "sneaky" ));
        let err = binder.configure_module().unwrap_err();

        let context = err.configuration().unwrap();
        assert_eq!( context.operation, Operation::Put );
        assert!( matches!( context.source, Error::UndeclaredKey { declaration: Declaration::Produces, .. }));
        assert!( matches!( assembly.get_data_value( KeyRef( &PRODUCED )), Err( Error::MissingValue( _ ))));
    }

    #[test]
    fn stored_value_of_wrong_type_fails_get() {
        let assembly = Assembly::new([ scripted( "reader", keys![], keys![ CONSUMED ], | binder | {
            let _ = CONSUMED.get( binder );
            Ok(())
        })]).unwrap();
        assembly.put_data_value( KeyRef( &CONSUMED ), Arc::new( "forty-two" )).unwrap();
        let binder = Binder::new( &assembly, binding_of( &assembly, "reader" ));
        let err = binder.configure_module().unwrap_err();

        let context = err.configuration().unwrap();
        assert_eq!( context.operation, Operation::Get );
        assert!( matches!( context.source, Error::TypeMismatch( key ) if key.signature() == CONSUMED.signature() ));
    }

    #[test]
    fn raw_put_of_wrong_type_is_rejected() {
        let assembly = Assembly::new([ scripted( "raw", keys![ PRODUCED ], keys![], | binder | {
            let _ = binder.put_data( &PRODUCED, Arc::new( 7_u64 ));
            Ok(())
        })]).unwrap();
        let binder = Binder::new( &assembly, binding_of( &assembly, "raw" ));
        let err = binder.configure_module().unwrap_err();

        let context = err.configuration().unwrap();
        assert_eq!( context.operation, Operation::Put );
        assert!( matches!( context.source, Error::TypeMismatch( _ )));
        assert!( matches!( assembly.get_data_value( KeyRef( &PRODUCED )), Err( Error::MissingValue( _ ))));
    }

    #[test]
    fn failed_get_is_tracked_with_context() {
        let assembly = Assembly::new([ scripted( "reader", keys![], keys![ CONSUMED ], | binder | {
            CONSUMED.get( binder )?;
            Ok(())
        })]).unwrap();
        let binder = Binder::new( &assembly, binding_of( &assembly, "reader" ));
        let err = binder.configure_module().unwrap_err();

        let context = err.configuration().unwrap();
        assert_eq!( context.module.name(), "reader" );
        assert_eq!( context.operation, Operation::Get );
        assert!( matches!( context.source, Error::MissingValue( key ) if key.signature() == CONSUMED.signature() ));
        assert!( binder.configuration_error().is_some() );
        assert_eq!( binding_of( &assembly, "reader" ).phase(), Phase::Failed );
    }

}
