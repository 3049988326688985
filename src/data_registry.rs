use std::collections::HashMap ;
use std::collections::hash_map::Entry ;
use parking_lot::Mutex ;

use crate::Error ;
use crate::data::{ KeyRef, KeySignature };



/// Maps each key signature to the one handle allowed to carry it.
///
/// Seeing a signature for the first time registers the handle. Seeing it again
/// through a different handle means two independently declared keys collided.
#[derive( Default )]
pub(crate) struct DataRegistry {
    store: Mutex<HashMap<KeySignature, KeyRef>>,
}

impl DataRegistry {

    pub(crate) fn validate( &self, key: KeyRef ) -> Result<(), Error> {
        match self.store.lock().entry( key.signature() ) {
            Entry::Vacant( entry ) => {
                entry.insert( key );
                Ok(())
            },
            Entry::Occupied( entry ) if *entry.get() == key => Ok(()),
            Entry::Occupied( entry ) => Err( Error::SignatureClash {
                signature: key.signature(),
                existing: entry.get().to_string(),
                existing_sequence: entry.get().0.sequence(),
                sequence: key.0.sequence(),
            }),
        }
    }

}

#[cfg( test )]
mod tests {
    use super::* ;
    use crate::{ Data, DataKey };

    static FIRST: Data<i32> = Data::new( "modbind::data_registry", "registry-test-1" );
    static SECOND: Data<i32> = Data::new( "modbind::data_registry", "registry-test-2" );
    static OTHER_TYPE: Data<String> = Data::new( "modbind::data_registry", "registry-test-3" );
    static CLASH_A: Data<i32> = Data::new( "modbind::data_registry", "clash" );
    static CLASH_B: Data<i32> = Data::new( "modbind::data_registry", "clash" );

    fn key( key: &'static dyn DataKey ) -> KeyRef { KeyRef( key ) }

    #[test]
    fn validate_registers_and_accepts_repeats() {
        let registry = DataRegistry::default();
        registry.validate( key( &FIRST )).unwrap();
        registry.validate( key( &FIRST )).unwrap();
        registry.validate( key( &SECOND )).unwrap();
        registry.validate( key( &OTHER_TYPE )).unwrap();
        assert_eq!( registry.store.lock().len(), 3 );
    }

    #[test]
    fn validate_rejects_signature_clash() {
        let registry = DataRegistry::default();
        registry.validate( key( &CLASH_A )).unwrap();
        match registry.validate( key( &CLASH_B )) {
            Err( Error::SignatureClash { signature, .. }) => assert_eq!( signature, CLASH_A.signature() ),
            other => panic!( "Expected signature clash, got {:?}", other ),
        }
        assert!( registry.store.lock().get( &CLASH_A.signature() ).is_some_and(| stored | *stored == key( &CLASH_A )));
    }

}
