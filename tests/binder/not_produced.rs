use modbind::{ Assembly, Data, Error, Operation, keys };
use crate::MockModule ;

static WRITTEN: Data<u8> = Data::new( module_path!(), "written" );
static FORGOTTEN: Data<u8> = Data::new( module_path!(), "forgotten" );
static ALSO_FORGOTTEN: Data<u8> = Data::new( module_path!(), "also-forgotten" );

#[test]
fn declared_but_not_produced_fails_build() {

	let module = MockModule::new( "forgetful" )
		.with_produces( keys![ WRITTEN, FORGOTTEN, ALSO_FORGOTTEN ])
		.with_configure(| binder | Ok( WRITTEN.put( binder, 1 )? ))
		.into_module();

	let assembly = Assembly::new([ module ]).unwrap();
	let result = assembly.build();

	match &result {
		Err( Error::Configuration( err )) => match &err.source {
			Error::NotProduced( missing ) => assert_eq!(
				missing.iter().into_iter().copied().collect::<Vec<_>>(),
				[ ALSO_FORGOTTEN.signature(), FORGOTTEN.signature() ],
			),
			other => panic!( "Expected not produced, got {:?}", other ),
		},
		other => panic!( "Expected configuration error, got {:?}", other ),
	}
	assert_configuration_error!( result, "forgetful", Operation::Configure, Error::NotProduced( _ ));

}

#[test]
fn consumers_of_unproduced_key_never_run() {

	let consumer = MockModule::new( "consumer" )
		.with_consumes( keys![ FORGOTTEN ])
		.with_configure(| _ | Err( "must not run".into() ))
		.into_module();
	let module = MockModule::new( "forgetful" ).with_produces( keys![ FORGOTTEN ]).into_module();

	let assembly = Assembly::new([ consumer, module ]).unwrap();
	assert_configuration_error!( assembly.build(), "forgetful", Operation::Configure, Error::NotProduced( _ ));

}
