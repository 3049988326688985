//! The engine that wires modules together.
//!
//! An [`Assembly`] owns the value store and the indices derived from module
//! declarations. Installing a module records what it produces and what it is still
//! waiting for; [`Assembly::build`] then configures modules one at a time, in the
//! order their inputs become available.

use std::collections::{ HashMap, VecDeque };
use std::sync::Arc ;
use itertools::Itertools ;
use parking_lot::Mutex ;
use tracing::{ debug, info, trace, warn };

use crate::{ Binder, Capability, Error, Module, ModuleSignature };
use crate::binding::Binding ;
use crate::data::{ DataKey, DataReader, KeyRef, Value };
use crate::data_registry::DataRegistry ;
use crate::error::UnmetDependency ;
use crate::utils::non_empty ;



#[derive( Copy, Clone, Debug, PartialEq, Eq, Default )]
enum BuildState {
    #[default] Pending,
    Running,
    Completed,
    Failed,
}

#[derive( Default )]
struct State {
    bindings: HashMap<ModuleSignature, Arc<Binding>>,
    install_order: Vec<ModuleSignature>,
    data: HashMap<KeyRef, Value>,
    producers: HashMap<KeyRef, ModuleSignature>,
    waiters: HashMap<KeyRef, Vec<Arc<Binding>>>,
    ready: VecDeque<Arc<Binding>>,
}

/// A set of modules and the data they exchange.
///
/// Construct it with the initial modules, call [`build`]( Self::build ) once, then
/// read produced values back through [`Data::get`]( crate::Data::get ):
///
/// ```
/// use std::sync::Arc ;
/// use modbind::{ Assembly, Binder, Data, DataKeys, Module, ModuleError, keys };
///
/// static PORT: Data<u16> = Data::new( "demo", "port" );
/// static ADDRESS: Data<String> = Data::new( "demo", "address" );
///
/// struct Settings ;
/// impl Module for Settings {
///     fn namespace( &self ) -> &str { "demo" }
///     fn name( &self ) -> &str { "settings" }
///     fn produces( &self ) -> DataKeys { keys![ PORT ] }
///     fn configure( &self, binder: &Binder<'_> ) -> Result<(), ModuleError> {
///         Ok( PORT.put( binder, 8080 )? )
///     }
/// }
///
/// struct Server ;
/// impl Module for Server {
///     fn namespace( &self ) -> &str { "demo" }
///     fn name( &self ) -> &str { "server" }
///     fn produces( &self ) -> DataKeys { keys![ ADDRESS ] }
///     fn consumes( &self ) -> DataKeys { keys![ PORT ] }
///     fn configure( &self, binder: &Binder<'_> ) -> Result<(), ModuleError> {
///         let port = PORT.get( binder )?;
///         Ok( ADDRESS.put( binder, format!( "localhost:{port}" ))? )
///     }
/// }
///
/// // Install order does not matter; `Server` waits for `PORT`.
/// let assembly = Assembly::new([
///     Arc::new( Server ) as Arc<dyn Module>,
///     Arc::new( Settings ),
/// ]).unwrap();
/// assembly.build().unwrap();
/// assert_eq!( ADDRESS.get( &assembly ).unwrap(), "localhost:8080" );
/// ```
///
/// Every mutation of the store and its indices takes a lock for the duration of
/// that one operation, so modules may install further modules while the build is
/// running.
pub struct Assembly {
    state: Mutex<State>,
    registry: DataRegistry,
    build_state: Mutex<BuildState>,
}

impl Default for Assembly {
    fn default() -> Self {
        Self {
            state: Mutex::new( State::default() ),
            registry: DataRegistry::default(),
            build_state: Mutex::new( BuildState::default() ),
        }
    }
}

impl Assembly {

    /// Creates an assembly and installs `modules` in order.
    ///
    /// # Errors
    /// Returns the first installation error; see [`install`]( Self::install ).
    pub fn new( modules: impl IntoIterator<Item = Arc<dyn Module>> ) -> Result<Self, Error> {
        let assembly = Self::default();
        modules.into_iter().try_for_each(| module | assembly.install( module ))?;
        Ok( assembly )
    }

    /// Installs a module.
    ///
    /// Installing a module whose signature is already present is a no-op if either
    /// module is [`Capability::Repeatable`], and an error otherwise.
    ///
    /// # Errors
    /// - [`Error::BuildStarted`] once [`build`]( Self::build ) has been called.
    ///   Modules installed during the build go through [`Binder::install`].
    /// - [`Error::AlreadyAdded`] for a second module with the same signature.
    /// - [`Error::DuplicateDeclaration`] if the module lists a key twice.
    /// - [`Error::DuplicateProducer`] if another module already produces one of its keys.
    /// - [`Error::SignatureClash`] if one of its keys shares a signature with a different handle.
    ///
    /// A rejected module leaves the assembly unchanged.
    pub fn install( &self, module: Arc<dyn Module> ) -> Result<(), Error> {
        self.install_with_parent( module, None )
    }

    /// Installs `module`. Without a parent this is a top-level install, which is
    /// only permitted before the build starts.
    pub(crate) fn install_with_parent(
        &self,
        module: Arc<dyn Module>,
        parent: Option<&ModuleSignature>,
    ) -> Result<(), Error> {

        // Module declarations are user code and run without the state lock held.
        let signature = ModuleSignature::of( module.as_ref() );
        let capability = module.capability();
        let discovered = Binding::discover( module, signature.clone(), parent.cloned() );

        let mut state = self.state.lock();

        if parent.is_none() && *self.build_state.lock() != BuildState::Pending {
            return Err( Error::BuildStarted );
        }

        if let Some( existing ) = state.bindings.get( &signature ) {
            let tolerated = capability == Capability::Repeatable
                || existing.capability() == Capability::Repeatable ;
            return match tolerated {
                true => {
                    debug!( target: "modbind::assembly", module = %signature, "Ignoring redundant installation" );
                    Ok(())
                },
                false => Err( Error::AlreadyAdded( signature )),
            };
        }

        let binding = Arc::new( discovered? );

        for key in binding.produces() {
            self.registry.validate( *key )?;
            if let Some( existing ) = state.producers.get( key ) {
                return Err( Error::DuplicateProducer {
                    key: key.signature(),
                    existing: existing.clone(),
                    module: binding.signature().clone(),
                });
            }
        }
        for key in binding.consumes() {
            self.registry.validate( *key )?;
        }

        for key in binding.produces() {
            state.producers.insert( *key, binding.signature().clone() );
        }
        for key in binding.consumes() {
            match state.data.contains_key( key ) {
                true => { binding.resolve( *key ); },
                false => state.waiters.entry( *key ).or_default().push( Arc::clone( &binding )),
            }
        }

        debug!(
            target: "modbind::assembly",
            module = %binding.signature(),
            parent = ?binding.parent().map( ToString::to_string ),
            ready = binding.is_ready(),
            "Installed module"
        );

        state.install_order.push( binding.signature().clone() );
        state.bindings.insert( binding.signature().clone(), Arc::clone( &binding ));
        if binding.is_ready() { state.ready.push_back( binding ); }

        Ok(())

    }

    /// Configures every installed module, in the order their inputs become available.
    ///
    /// Modules are configured one at a time. The first failure stops the build; values
    /// already written stay in place but can no longer be read from outside.
    ///
    /// # Errors
    /// - [`Error::AlreadyBuilt`] if called more than once, whatever the first call returned.
    /// - [`Error::Configuration`] with the failing module and operation if a module fails.
    /// - [`Error::Unresolved`] if modules are left waiting on keys nobody produced, including
    ///   modules that wait on each other.
    pub fn build( &self ) -> Result<(), Error> {

        {
            // Taken in install order so no top-level install can slip in after the transition.
            let _state = self.state.lock();
            let mut build_state = self.build_state.lock();
            if *build_state != BuildState::Pending { return Err( Error::AlreadyBuilt ) }
            *build_state = BuildState::Running ;
        }

        debug!( target: "modbind::assembly", modules = self.state.lock().install_order.len(), "Starting build" );
        let result = self.configure_ready();

        *self.build_state.lock() = match result.is_ok() {
            true => BuildState::Completed,
            false => BuildState::Failed,
        };
        match &result {
            Ok(()) => info!( target: "modbind::assembly", modules = self.state.lock().install_order.len(), "Build completed" ),
            Err( err ) => warn!( target: "modbind::assembly", error = %err, "Build failed" ),
        }
        result

    }

    fn configure_ready( &self ) -> Result<(), Error> {
        while let Some( binding ) = self.pop_ready() {
            Binder::new( self, binding ).configure_module()?;
        }
        match non_empty( self.pending() ) {
            Some( unmet ) => Err( Error::Unresolved( unmet )),
            Option::None => Ok(()),
        }
    }

    fn pop_ready( &self ) -> Option<Arc<Binding>> {
        let binding = self.state.lock().ready.pop_front()?;
        debug!( target: "modbind::assembly", module = %binding.signature(), "Dequeued ready module" );
        Some( binding )
    }

    /// Keys that modules are still waiting on, in signature order.
    ///
    /// Each entry lists the waiting modules in the order they were installed.
    /// After a successful build this is empty.
    pub fn pending( &self ) -> Vec<UnmetDependency> {
        self.state.lock().waiters.iter()
            .map(|( key, waiting )| UnmetDependency {
                key: key.signature(),
                waiting: waiting.iter().map(| binding | binding.signature().clone() ).collect(),
            })
            .sorted_by_key(| unmet | unmet.key )
            .collect()
    }

    /// Signatures of the installed modules, in installation order.
    pub fn modules( &self ) -> Vec<ModuleSignature> { self.state.lock().install_order.clone() }

    /// Whether [`build`]( Self::build ) has completed successfully.
    pub fn is_built( &self ) -> bool { *self.build_state.lock() == BuildState::Completed }

    pub(crate) fn get_data_value( &self, key: KeyRef ) -> Result<Value, Error> {
        self.state.lock().data.get( &key )
            .cloned()
            .ok_or( Error::MissingValue( key.0 ))
    }

    /// Stores `value` and moves every module that was only waiting on `key` to the ready queue.
    pub(crate) fn put_data_value( &self, key: KeyRef, value: Value ) -> Result<(), Error> {

        let mut state = self.state.lock();
        if state.data.contains_key( &key ) { return Err( Error::AlreadySet( key.0 )) }
        state.data.insert( key, value );
        trace!( target: "modbind::assembly", %key, "Stored value" );

        for binding in state.waiters.remove( &key ).unwrap_or_default() {
            if binding.resolve( key ) {
                debug!( target: "modbind::assembly", module = %binding.signature(), %key, "Module became ready" );
                state.ready.push_back( binding );
            }
        }

        Ok(())

    }

    #[cfg( test )]
    pub(crate) fn binding( &self, signature: &ModuleSignature ) -> Option<Arc<Binding>> {
        self.state.lock().bindings.get( signature ).cloned()
    }

}

impl DataReader for Assembly {
    /// Reads a produced value. Only permitted once the build has completed successfully.
    fn get_data( &self, key: &'static dyn DataKey ) -> Result<Value, Error> {
        match self.is_built() {
            true => self.get_data_value( KeyRef( key )),
            false => Err( Error::NotBuilt ),
        }
    }
}

impl std::fmt::Debug for Assembly {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct( "Assembly" )
            .field( "modules", &state.install_order )
            .field( "values", &state.data.len() )
            .field( "ready", &state.ready.iter().map(| binding | binding.signature() ).collect::<Vec<_>>() )
            .field( "build_state", &*self.build_state.lock() )
            .finish_non_exhaustive()
    }
}

#[cfg( test )]
mod tests {
    use super::* ;
    use std::sync::Weak ;
    use once_cell::sync::OnceCell ;
    use crate::{ Data, DataKeys, ModuleError, keys };

    static NUMBER: Data<i32> = Data::new( "modbind::assembly", "number" );
    static TEXT: Data<String> = Data::new( "modbind::assembly", "text" );

    struct Waiting { name: &'static str, produces: DataKeys, consumes: DataKeys }
    impl Module for Waiting {
        fn namespace( &self ) -> &str { "modbind::assembly" }
        fn name( &self ) -> &str { self.name }
        fn produces( &self ) -> DataKeys { self.produces.clone() }
        fn consumes( &self ) -> DataKeys { self.consumes.clone() }
        fn configure( &self, _: &Binder<'_> ) -> Result<(), ModuleError> { Ok(()) }
    }

    fn waiting( name: &'static str, produces: DataKeys, consumes: DataKeys ) -> Arc<dyn Module> {
        Arc::new( Waiting { name, produces, consumes })
    }

    fn ready_names( assembly: &Assembly ) -> Vec<String> {
        assembly.state.lock().ready.iter().map(| binding | binding.signature().name().to_string() ).collect()
    }

    #[test]
    fn store_is_write_once() {
        let assembly = Assembly::default();
        assert!( matches!( assembly.get_data_value( KeyRef( &NUMBER )), Err( Error::MissingValue( _ ))));
        assembly.put_data_value( KeyRef( &NUMBER ), Arc::new( 1 )).unwrap();
        assert!( matches!( assembly.put_data_value( KeyRef( &NUMBER ), Arc::new( 2 )), Err( Error::AlreadySet( _ ))));
        let stored = assembly.get_data_value( KeyRef( &NUMBER )).unwrap();
        assert_eq!( stored.downcast_ref::<i32>(), Some( &1 ));
    }

    #[test]
    fn put_releases_waiters_in_install_order() {
        let assembly = Assembly::new([
            waiting( "first", keys![], keys![ NUMBER ]),
            waiting( "both", keys![], keys![ NUMBER, TEXT ]),
            waiting( "second", keys![], keys![ NUMBER ]),
        ]).unwrap();
        assert!( ready_names( &assembly ).is_empty() );

        assembly.put_data_value( KeyRef( &NUMBER ), Arc::new( 1 )).unwrap();
        assert_eq!( ready_names( &assembly ), [ "first", "second" ]);
        assert!( !assembly.state.lock().waiters.contains_key( &KeyRef( &NUMBER )));

        assembly.put_data_value( KeyRef( &TEXT ), Arc::new( String::new() )).unwrap();
        assert_eq!( ready_names( &assembly ), [ "first", "second", "both" ]);
        assert!( assembly.pending().is_empty() );
    }

    #[test]
    fn install_skips_waiting_for_stored_values() {
        let assembly = Assembly::default();
        assembly.put_data_value( KeyRef( &NUMBER ), Arc::new( 1 )).unwrap();
        assembly.install( waiting( "late", keys![], keys![ NUMBER ])).unwrap();
        assert_eq!( ready_names( &assembly ), [ "late" ]);
        assert!( assembly.state.lock().waiters.is_empty() );
    }

    #[test]
    fn rejected_install_leaves_indices_untouched() {
        let assembly = Assembly::new([ waiting( "producer", keys![ NUMBER ], keys![]) ]).unwrap();
        let err = assembly.install( waiting( "rival", keys![ TEXT, NUMBER ], keys![ TEXT ])).unwrap_err();
        assert!( matches!( err, Error::DuplicateProducer { .. }));

        let state = assembly.state.lock();
        assert!( !state.producers.contains_key( &KeyRef( &TEXT )));
        assert!( state.waiters.is_empty() );
        assert_eq!( state.install_order.len(), 1 );
    }

    #[test]
    fn pending_is_sorted_by_key() {
        let assembly = Assembly::new([
            waiting( "b", keys![], keys![ TEXT ]),
            waiting( "a", keys![], keys![ NUMBER, TEXT ]),
        ]).unwrap();
        let pending = assembly.pending();
        assert_eq!( pending.iter().map(| unmet | unmet.key ).collect::<Vec<_>>(), [ NUMBER.signature(), TEXT.signature() ]);
        assert_eq!( pending[ 1 ].waiting, [ ModuleSignature::new( "modbind::assembly", "b" ), ModuleSignature::new( "modbind::assembly", "a" ) ]);
    }

    #[test]
    fn install_after_build_is_rejected() {
        let assembly = Assembly::default();
        assembly.build().unwrap();
        assert!( matches!( assembly.install( waiting( "late", keys![], keys![]) ), Err( Error::BuildStarted )));
    }


    /// Module that reaches back into the assembly from its declarations and its
    /// configuration step.
    struct Reentrant { assembly: Arc<OnceCell<Weak<Assembly>>>, installed_late: Arc<Mutex<Option<Result<(), Error>>>> }
    impl Module for Reentrant {
        fn namespace( &self ) -> &str { "modbind::assembly" }
        fn name( &self ) -> &str { "reentrant" }
        fn consumes( &self ) -> DataKeys {
            if let Some( assembly ) = self.assembly.get().and_then( Weak::upgrade ) {
                assert!( assembly.pending().is_empty() );
                assert!( !assembly.is_built() );
            }
            DataKeys::new()
        }
        fn capability( &self ) -> Capability {
            if let Some( assembly ) = self.assembly.get().and_then( Weak::upgrade ) {
                let _ = assembly.modules();
            }
            Capability::Plain
        }
        fn configure( &self, _: &Binder<'_> ) -> Result<(), ModuleError> {
            if let Some( assembly ) = self.assembly.get().and_then( Weak::upgrade ) {
                *self.installed_late.lock() = Some( assembly.install( waiting( "sneaked-in", keys![], keys![]) ));
            }
            Ok(())
        }
    }

    fn reentrant() -> ( Arc<Assembly>, Arc<Mutex<Option<Result<(), Error>>>> ) {
        let assembly = Arc::new( Assembly::default() );
        let cell = Arc::new( OnceCell::new() );
        let _ = cell.set( Arc::downgrade( &assembly ));
        let installed_late = Arc::new( Mutex::new( None ));
        assembly.install( Arc::new( Reentrant { assembly: cell, installed_late: Arc::clone( &installed_late ) })).unwrap();
        ( assembly, installed_late )
    }

    #[test]
    fn declarations_may_query_the_assembly() {
        let ( assembly, _ ) = reentrant();
        assert_eq!( assembly.modules(), [ ModuleSignature::new( "modbind::assembly", "reentrant" )]);
        assert_eq!( ready_names( &assembly ), [ "reentrant" ]);
    }

    #[test]
    fn top_level_install_during_build_is_rejected() {
        let ( assembly, installed_late ) = reentrant();
        assembly.build().unwrap();
        assert!( matches!( *installed_late.lock(), Some( Err( Error::BuildStarted ))));
        assert_eq!( assembly.modules().len(), 1 );
    }

}
