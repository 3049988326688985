use std::collections::HashMap ;
use std::sync::Arc ;
use parking_lot::Mutex ;
use modbind::{ Data, DataKey, DataReader, DataWriter, Error, KeySignature, Value };

static COUNT: Data<u64> = Data::new( module_path!(), "count" );
static LABEL: Data<String> = Data::new( module_path!(), "label" );

/// Store keyed by signature only, so differently typed handles can collide.
#[derive( Default )]
struct SignatureStore( Mutex<HashMap<KeySignature, Value>> );

impl DataReader for SignatureStore {
	fn get_data( &self, key: &'static dyn DataKey ) -> Result<Value, Error> {
		self.0.lock().get( &key.signature() ).cloned().ok_or( Error::MissingValue( key ))
	}
}

impl DataWriter for SignatureStore {
	fn put_data( &self, key: &'static dyn DataKey, value: Value ) -> Result<(), Error> {
		self.0.lock().insert( key.signature(), value );
		Ok(())
	}
}

#[test]
fn handles_work_with_any_reader_and_writer() {
	let store = SignatureStore::default();
	COUNT.put( &store, 3 ).unwrap();
	LABEL.put( &store, "three".to_string() ).unwrap();
	assert_eq!( COUNT.get( &store ).unwrap(), 3 );
	assert_eq!( LABEL.get( &store ).unwrap(), "three" );
}

#[test]
fn missing_value_is_reported() {
	let store = SignatureStore::default();
	assert!( matches!( COUNT.get( &store ), Err( Error::MissingValue( key )) if key.signature() == COUNT.signature() ));
}

#[test]
fn wrong_payload_type_is_a_type_mismatch() {

	let store = SignatureStore::default();
	store.0.lock().insert( COUNT.signature(), Arc::new( "not a number" ));

	match COUNT.get( &store ) {
		Err( err @ Error::TypeMismatch( _ )) => {
			assert!( matches!( err, Error::TypeMismatch( key ) if key.signature() == COUNT.signature() && key.type_name() == "u64" ));
			assert_eq!( err.to_string(), format!( "data key 'Data[u64]({}#{})': type mismatch, expected u64", COUNT.signature(), COUNT.sequence() ));
		},
		other => panic!( "Expected type mismatch, got {:?}", other ),
	}

}

#[test]
fn handles_work_through_trait_objects() {
	let store = SignatureStore::default();
	let writer: &dyn DataWriter = &store ;
	let reader: &dyn DataReader = &store ;
	COUNT.put( writer, 9 ).unwrap();
	assert_eq!( COUNT.get( reader ).unwrap(), 9 );
}
