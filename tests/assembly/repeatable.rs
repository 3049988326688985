use modbind::{ Assembly, Data, Error, ModuleSignature, keys };
use crate::{ Journal, MockModule, recorder };

static SHARED: Data<&'static str> = Data::new( module_path!(), "shared" );

#[test]
fn repeatable_module_is_installed_once() {

	let journal = Journal::default();
	let shared = || MockModule::new( "shared" ).repeatable().with_configure( recorder( &journal, "shared" )).into_module();

	let assembly = Assembly::new([ shared(), shared() ]).unwrap();
	assembly.install( shared() ).unwrap();
	assembly.build().unwrap();

	assert_eq!( assembly.modules(), [ ModuleSignature::new( "modbind::tests", "shared" )]);
	assert_eq!( journal.entries(), [ "shared" ]);

}

#[test]
fn existing_repeatable_tolerates_plain_duplicate() {

	let first = MockModule::new( "dup" ).repeatable().with_produces( keys![ SHARED ]).into_module();
	let second = MockModule::new( "dup" ).into_module();

	let assembly = Assembly::new([ first, second ]).unwrap();
	assert_eq!( assembly.modules().len(), 1 );

}

#[test]
fn plain_duplicate_of_plain_is_rejected() {
	let result = Assembly::new([ MockModule::new( "dup" ).into_module(), MockModule::new( "dup" ).into_module() ]);
	match result {
		Err( Error::AlreadyAdded( signature )) => assert_eq!( signature.to_string(), "modbind::tests:dup" ),
		other => panic!( "Expected already added, got {:?}", other.map(| _ | ()) ),
	}
}

#[test]
fn repeatable_shared_dependency_installed_from_modules() {

	let shared_dependency = || MockModule::new( "common" )
		.repeatable()
		.with_produces( keys![ SHARED ])
		.with_configure(| binder | Ok( SHARED.put( binder, "common" )? ))
		.into_module();
	let dependant = | name | MockModule::new( name )
		.with_configure( move | binder | Ok( binder.install( shared_dependency() )? ))
		.into_module();

	let assembly = Assembly::new([ dependant( "first" ), dependant( "second" )]).unwrap();
	assembly.build().unwrap();

	assert_eq!( SHARED.get( &assembly ).unwrap(), "common" );
	assert_eq!( assembly.modules().iter().map( ModuleSignature::name ).collect::<Vec<_>>(), [ "first", "second", "common" ]);

}

#[test]
fn repeatable_after_plain_is_a_no_op() {

	let journal = Journal::default();
	let assembly = Assembly::new([
		MockModule::new( "dup" ).with_configure( recorder( &journal, "plain" )).into_module(),
		MockModule::new( "dup" ).repeatable().with_configure( recorder( &journal, "repeatable" )).into_module(),
	]).unwrap();

	assert_eq!( assembly.modules(), [ ModuleSignature::new( "modbind::tests", "dup" )]);
	assembly.build().unwrap();
	assert_eq!( journal.entries(), [ "plain" ]);

}

#[test]
fn nested_repeatable_matching_plain_is_a_no_op() {

	let journal = Journal::default();
	let plain = MockModule::new( "common" )
		.with_produces( keys![ SHARED ])
		.with_configure({
			let journal = journal.clone();
			move | binder | { journal.record( "plain" ); Ok( SHARED.put( binder, "plain" )? )}
		})
		.into_module();
	let installer = {
		let journal = journal.clone();
		MockModule::new( "installer" )
			.with_consumes( keys![ SHARED ])
			.with_configure( move | binder | {
				journal.record( "installer" );
				let repeatable = MockModule::new( "common" )
					.repeatable()
					.with_produces( keys![ SHARED ])
					.with_configure( recorder( &journal, "repeatable" ))
					.into_module();
				Ok( binder.install( repeatable )? )
			})
			.into_module()
	};

	let assembly = Assembly::new([ plain, installer ]).unwrap();
	assembly.build().unwrap();

	assert_eq!( journal.entries(), [ "plain", "installer" ]);
	assert_eq!( SHARED.get( &assembly ).unwrap(), "plain" );
	assert_eq!( assembly.modules().len(), 2 );

}
