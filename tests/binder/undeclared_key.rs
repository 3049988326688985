use modbind::{ Assembly, Data, Declaration, Error, Operation, keys };
use crate::MockModule ;

static DECLARED: Data<u8> = Data::new( module_path!(), "declared" );
static UNDECLARED: Data<u8> = Data::new( module_path!(), "undeclared" );

#[test]
fn get_of_undeclared_key_fails_even_if_stored() {

	let producer = MockModule::new( "producer" )
		.with_produces( keys![ UNDECLARED ])
		.with_configure(| binder | Ok( UNDECLARED.put( binder, 1 )? ))
		.into_module();
	let gate = MockModule::new( "gate" )
		.with_produces( keys![ DECLARED ])
		.with_consumes( keys![ UNDECLARED ])
		.with_configure(| binder | Ok( DECLARED.put( binder, 2 )? ))
		.into_module();
	// Runs last, when `UNDECLARED` is already stored.
	let reader = MockModule::new( "reader" )
		.with_consumes( keys![ DECLARED ])
		.with_configure(| binder | { UNDECLARED.get( binder )?; Ok(()) })
		.into_module();

	let assembly = Assembly::new([ producer, gate, reader ]).unwrap();
	assert_configuration_error!(
		assembly.build(), "reader", Operation::Get,
		Error::UndeclaredKey { declaration: Declaration::Consumes, .. }
	);

}

#[test]
fn put_of_undeclared_key_fails() {

	let writer = MockModule::new( "writer" )
		.with_produces( keys![ DECLARED ])
		.with_configure(| binder | {
			DECLARED.put( binder, 1 )?;
			UNDECLARED.put( binder, 2 )?;
			Ok(())
		})
		.into_module();

	let assembly = Assembly::new([ writer ]).unwrap();
	let result = assembly.build();
	assert!( result.as_ref().is_err_and(| err | err.to_string()
		== format!( "module 'modbind::tests:writer' put: module 'modbind::tests:writer' did not declare '{}' in produces", UNDECLARED.signature() )));
	assert_configuration_error!( result, "writer", Operation::Put, Error::UndeclaredKey { declaration: Declaration::Produces, .. });

}

#[test]
fn consuming_key_does_not_permit_writing_it() {

	let producer = MockModule::new( "producer" )
		.with_produces( keys![ DECLARED ])
		.with_configure(| binder | Ok( DECLARED.put( binder, 1 )? ))
		.into_module();
	let overwriter = MockModule::new( "overwriter" )
		.with_consumes( keys![ DECLARED ])
		.with_configure(| binder | Ok( DECLARED.put( binder, 2 )? ))
		.into_module();

	let assembly = Assembly::new([ producer, overwriter ]).unwrap();
	assert_configuration_error!( assembly.build(), "overwriter", Operation::Put, Error::UndeclaredKey { .. });

}
