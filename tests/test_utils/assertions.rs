#[macro_export]
macro_rules! assert_configuration_error {
	( $result:expr, $module:literal, $operation:expr, $source:pat ) => {
		match $result {
			Err( modbind::Error::Configuration( err )) => {
				assert_eq!( err.module.name(), $module );
				assert_eq!( err.operation, $operation );
				assert!( matches!( err.source, $source ), "Unexpected source: {:?}", err.source );
			},
			other => panic!( "Expected configuration error, got {:?}", other ),
		}
	};
}

#[macro_export]
macro_rules! assert_unresolved {
	( $result:expr, [ $( $key:expr ),* $(,)? ] ) => {
		match $result {
			Err( modbind::Error::Unresolved( unmet )) => assert_eq!(
				unmet.iter().into_iter().map(| unmet | unmet.key ).collect::<Vec<_>>(),
				vec![ $( $key.signature() ),* ],
			),
			other => panic!( "Expected unresolved dependencies, got {:?}", other ),
		}
	};
}
