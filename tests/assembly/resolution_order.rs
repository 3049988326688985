use modbind::{ Assembly, Data, keys };
use crate::{ Journal, MockModule, recorder };

static ROOT: Data<u8> = Data::new( module_path!(), "root" );
static LEFT: Data<u8> = Data::new( module_path!(), "left" );
static RIGHT: Data<u8> = Data::new( module_path!(), "right" );
static JOINED: Data<u8> = Data::new( module_path!(), "joined" );

#[test]
fn released_modules_join_the_back_of_the_queue() {

	let journal = Journal::default();

	// `waiter` is released by `source`'s write but queues behind `independent`,
	// which was ready from the start.
	let source = { let journal = journal.clone(); MockModule::new( "source" )
		.with_produces( keys![ ROOT ])
		.with_configure( move | binder | { journal.record( "source" ); Ok( ROOT.put( binder, 1 )? )})};
	let waiter = MockModule::new( "waiter" ).with_consumes( keys![ ROOT ]).with_configure( recorder( &journal, "waiter" ));
	let independent = MockModule::new( "independent" ).with_configure( recorder( &journal, "independent" ));

	let assembly = Assembly::new([
		waiter.into_module(),
		source.into_module(),
		independent.into_module(),
	]).unwrap();
	assembly.build().unwrap();

	assert_eq!( journal.entries(), [ "source", "independent", "waiter" ]);

}

#[test]
fn diamond_is_configured_breadth_first() {

	let journal = Journal::default();
	let module = | name: &'static str, produces: &'static Data<u8>, consumes: modbind::DataKeys | {
		let journal = journal.clone();
		MockModule::new( name )
			.with_produces( vec![ produces as &'static dyn modbind::DataKey ])
			.with_consumes( consumes )
			.with_configure( move | binder | {
				journal.record( name );
				Ok( produces.put( binder, 0 )? )
			})
			.into_module()
	};

	let assembly = Assembly::new([
		module( "joined", &JOINED, keys![ LEFT, RIGHT ]),
		module( "right", &RIGHT, keys![ ROOT ]),
		module( "left", &LEFT, keys![ ROOT ]),
		module( "root", &ROOT, keys![]),
	]).unwrap();
	assembly.build().unwrap();

	// Waiters on `ROOT` are released in install order.
	assert_eq!( journal.entries(), [ "root", "right", "left", "joined" ]);
	assert_eq!( JOINED.get( &assembly ).unwrap(), 0 );

}
