use modbind::{ Assembly, Data, Error, keys };
use crate::MockModule ;

static KEY: Data<u8> = Data::new( module_path!(), "key" );
static OTHER: Data<u8> = Data::new( module_path!(), "other" );

#[test]
fn same_signature_different_namespace_is_distinct() {
	let assembly = Assembly::new([
		MockModule::new( "module" ).in_namespace( "first" ).into_module(),
		MockModule::new( "module" ).in_namespace( "second" ).into_module(),
	]).unwrap();
	assert_eq!( assembly.modules().len(), 2 );
}

#[test]
fn duplicate_produces_declaration_is_rejected() {
	let module = MockModule::new( "twice" ).with_produces( keys![ KEY, OTHER, KEY ]).into_module();
	match Assembly::new([ module ]) {
		Err( err @ Error::DuplicateDeclaration { .. }) => assert_eq!(
			err.to_string(),
			format!( "module 'modbind::tests:twice': failed to convert produces to set: duplicate key '{}'", KEY.signature() ),
		),
		other => panic!( "Expected duplicate declaration, got {:?}", other.map(| _ | ()) ),
	}
}

#[test]
fn duplicate_consumes_declaration_is_rejected() {
	let module = MockModule::new( "twice" ).with_consumes( keys![ OTHER, OTHER ]).into_module();
	let assembly = Assembly::default();
	assert!( matches!( assembly.install( module ), Err( Error::DuplicateDeclaration { .. })));
	assert!( assembly.modules().is_empty() );
	assert!( assembly.pending().is_empty() );
}
