//! Per-module runtime record kept by the [`Assembly`]( crate::Assembly ).
//!
//! A [`Binding`] is created when a module is installed. It remembers what the
//! module declared, which consumed keys are still missing, which produced keys
//! have been written, and where the module is in its lifecycle.

use std::collections::HashSet ;
use std::sync::Arc ;
use itertools::Itertools ;
use parking_lot::Mutex ;

use crate::{ Capability, Error, Module, ModuleSignature };
use crate::data::{ DataKeys, KeyRef };
use crate::error::Declaration ;



/// Lifecycle of a binding. Every transition happens at most once.
#[derive( Copy, Clone, Debug, PartialEq, Eq )]
pub(crate) enum Phase {
    /// Installed; may or may not be ready yet.
    Installed,
    /// The module's `configure` is running.
    Configuring,
    Configured,
    Failed,
}

pub(crate) struct Binding {
    signature: ModuleSignature,
    module: Arc<dyn Module>,
    capability: Capability,
    parent: Option<ModuleSignature>,
    produces: HashSet<KeyRef>,
    consumes: HashSet<KeyRef>,
    waiting: Mutex<HashSet<KeyRef>>,
    produced: Mutex<HashSet<KeyRef>>,
    phase: Mutex<Phase>,
}

impl Binding {

    /// Runs contract discovery: turns the module's declarations into sets,
    /// rejecting any declaration that lists a key twice. Declarations are read
    /// once, here, and never again.
    pub(crate) fn discover(
        module: Arc<dyn Module>,
        signature: ModuleSignature,
        parent: Option<ModuleSignature>,
    ) -> Result<Self, Error> {
        let produces = into_set( &signature, Declaration::Produces, module.produces() )?;
        let consumes = into_set( &signature, Declaration::Consumes, module.consumes() )?;
        Ok( Self {
            signature,
            capability: module.capability(),
            module,
            parent,
            waiting: Mutex::new( consumes.clone() ),
            produces,
            consumes,
            produced: Mutex::new( HashSet::new() ),
            phase: Mutex::new( Phase::Installed ),
        })
    }

    #[inline] pub(crate) fn signature( &self ) -> &ModuleSignature { &self.signature }
    #[inline] pub(crate) fn module( &self ) -> &dyn Module { self.module.as_ref() }
    #[inline] pub(crate) fn capability( &self ) -> Capability { self.capability }
    #[inline] pub(crate) fn parent( &self ) -> Option<&ModuleSignature> { self.parent.as_ref() }
    #[inline] pub(crate) fn produces( &self ) -> &HashSet<KeyRef> { &self.produces }
    #[inline] pub(crate) fn consumes( &self ) -> &HashSet<KeyRef> { &self.consumes }
    #[inline] pub(crate) fn phase( &self ) -> Phase { *self.phase.lock() }

    /// Moves from `from` to `to`, returning whether this call made the transition.
    pub(crate) fn transition( &self, from: Phase, to: Phase ) -> bool {
        let mut phase = self.phase.lock();
        match *phase == from {
            true => { *phase = to ; true },
            false => false,
        }
    }

    /// Whether every consumed key has a value.
    pub(crate) fn is_ready( &self ) -> bool { self.waiting.lock().is_empty() }

    /// Marks `key` as available. Returns `true` if this made the binding ready.
    pub(crate) fn resolve( &self, key: KeyRef ) -> bool {
        let mut waiting = self.waiting.lock();
        waiting.remove( &key ) && waiting.is_empty()
    }

    pub(crate) fn mark_produced( &self, key: KeyRef ) {
        self.produced.lock().insert( key );
    }

    /// Produced keys that were declared but never written, in signature order.
    pub(crate) fn unproduced( &self ) -> Vec<KeyRef> {
        let produced = self.produced.lock();
        self.produces.iter()
            .filter(| key | !produced.contains( key ))
            .copied()
            .sorted_by_key(| key | key.signature() )
            .collect()
    }

}

impl std::fmt::Debug for Binding {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "Binding" )
            .field( "signature", &self.signature )
            .field( "parent", &self.parent )
            .field( "produces", &self.produces )
            .field( "consumes", &self.consumes )
            .field( "waiting", &*self.waiting.lock() )
            .field( "phase", &self.phase() )
            .finish_non_exhaustive()
    }
}

fn into_set(
    module: &ModuleSignature,
    declaration: Declaration,
    keys: DataKeys,
) -> Result<HashSet<KeyRef>, Error> {
    let keys = keys.into_iter().map( KeyRef ).collect::<Vec<_>>();
    match keys.iter().duplicates().next() {
        Some( key ) => Err( Error::DuplicateDeclaration { module: module.clone(), declaration, key: key.signature() }),
        Option::None => Ok( keys.into_iter().collect() ),
    }
}

#[cfg( test )]
mod tests {
    use super::* ;
    use crate::{ Binder, Data, ModuleError, keys };

    static PRODUCED: Data<String> = Data::new( "modbind::binding", "produced" );
    static CONSUMED: Data<i32> = Data::new( "modbind::binding", "consumed" );

    struct Declaring { produces: fn() -> DataKeys, consumes: fn() -> DataKeys }
    impl Module for Declaring {
        fn namespace( &self ) -> &str { "modbind::binding" }
        fn name( &self ) -> &str { "declaring" }
        fn produces( &self ) -> DataKeys { ( self.produces )() }
        fn consumes( &self ) -> DataKeys { ( self.consumes )() }
        fn configure( &self, _: &Binder<'_> ) -> Result<(), ModuleError> { Ok(()) }
    }

    fn discover( produces: fn() -> DataKeys, consumes: fn() -> DataKeys ) -> Result<Binding, Error> {
        let module = Arc::new( Declaring { produces, consumes });
        let signature = ModuleSignature::of( module.as_ref() );
        Binding::discover( module, signature, None )
    }

    #[test]
    fn discover_collects_declarations() {
        let binding = discover(|| keys![ PRODUCED ], || keys![ CONSUMED ]).unwrap();
        assert!( binding.produces().contains( &KeyRef( &PRODUCED )));
        assert!( binding.consumes().contains( &KeyRef( &CONSUMED )));
        assert!( !binding.is_ready() );
    }

    #[test]
    fn discover_without_keys_is_ready() {
        let binding = discover( DataKeys::new, DataKeys::new ).unwrap();
        assert!( binding.produces().is_empty() );
        assert!( binding.consumes().is_empty() );
        assert!( binding.is_ready() );
    }

    #[test]
    fn discover_rejects_duplicate_produces() {
        match discover(|| keys![ PRODUCED, PRODUCED ], DataKeys::new ) {
            Err( Error::DuplicateDeclaration { declaration: Declaration::Produces, key, .. }) => assert_eq!( key, PRODUCED.signature() ),
            other => panic!( "Expected duplicate declaration, got {:?}", other.map(| _ | ()) ),
        }
    }

    #[test]
    fn discover_rejects_duplicate_consumes() {
        match discover( DataKeys::new, || keys![ CONSUMED, CONSUMED ]) {
            Err( Error::DuplicateDeclaration { declaration: Declaration::Consumes, .. }) => {},
            other => panic!( "Expected duplicate declaration, got {:?}", other.map(| _ | ()) ),
        }
    }

    #[test]
    fn resolve_makes_binding_ready() {
        let binding = discover( DataKeys::new, || keys![ CONSUMED ]).unwrap();
        assert!( !binding.is_ready() );
        assert!( binding.resolve( KeyRef( &CONSUMED )));
        assert!( binding.is_ready() );
        assert!( !binding.resolve( KeyRef( &CONSUMED )));
    }

    #[test]
    fn transition_happens_once() {
        let binding = discover( DataKeys::new, DataKeys::new ).unwrap();
        assert!( binding.transition( Phase::Installed, Phase::Configuring ));
        assert!( !binding.transition( Phase::Installed, Phase::Configuring ));
        assert_eq!( binding.phase(), Phase::Configuring );
    }

    #[test]
    fn unproduced_lists_missing_keys() {
        let binding = discover(|| keys![ PRODUCED ], DataKeys::new ).unwrap();
        assert_eq!( binding.unproduced(), vec![ KeyRef( &PRODUCED ) ]);
        binding.mark_produced( KeyRef( &PRODUCED ));
        assert!( binding.unproduced().is_empty() );
    }

}
