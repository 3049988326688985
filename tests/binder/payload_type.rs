use std::sync::Arc ;
use modbind::{ Assembly, Data, DataWriter, Error, Operation, keys };
use crate::{ Journal, MockModule, recorder };

static COUNT: Data<u64> = Data::new( module_path!(), "count" );

#[test]
fn raw_put_of_wrong_type_fails_the_build() {

	let journal = Journal::default();
	let writer = MockModule::new( "writer" )
		.with_produces( keys![ COUNT ])
		.with_configure(| binder | {
			// The result is dropped; the build must still fail.
			let _ = binder.put_data( &COUNT, Arc::new( "not a number" ));
			Ok(())
		})
		.into_module();
	let reader = MockModule::new( "reader" )
		.with_consumes( keys![ COUNT ])
		.with_configure( recorder( &journal, "reader" ))
		.into_module();

	let assembly = Assembly::new([ writer, reader ]).unwrap();
	assert_configuration_error!( assembly.build(), "writer", Operation::Put, Error::TypeMismatch( _ ));

	assert!( journal.entries().is_empty() );
	assert!( matches!( COUNT.get( &assembly ), Err( Error::NotBuilt )));

}

#[test]
fn raw_put_of_matching_type_is_accepted() {

	let writer = MockModule::new( "writer" )
		.with_produces( keys![ COUNT ])
		.with_configure(| binder | Ok( binder.put_data( &COUNT, Arc::new( 5_u64 ))? ))
		.into_module();

	let assembly = Assembly::new([ writer ]).unwrap();
	assembly.build().unwrap();
	assert_eq!( COUNT.get( &assembly ).unwrap(), 5 );

}

#[test]
fn type_mismatch_names_the_handle() {

	let writer = MockModule::new( "writer" )
		.with_produces( keys![ COUNT ])
		.with_configure(| binder | Ok( binder.put_data( &COUNT, Arc::new( -1_i32 ))? ))
		.into_module();

	let assembly = Assembly::new([ writer ]).unwrap();
	let message = assembly.build().unwrap_err().to_string();
	assert_eq!( message, format!( "module 'modbind::tests:writer' put: data key '{}': type mismatch, expected u64", COUNT ));

}
