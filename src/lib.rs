//! Dependency wiring for modular applications.
//!
//! An application is split into **modules**. Each module declares the typed
//! **data keys** it produces and the ones it consumes. `modbind` works out an
//! initialization order from these declarations, calls each module's
//! configuration step exactly once when its inputs are available, and makes sure
//! a module only ever touches the keys it declared.
//!
//! # Core Concepts
//!
//! - [`Data`]: A typed, named contract for a single value. Declared once as a
//! 	`static`; its `( namespace, name )` [`KeySignature`] must be unique across the
//! 	application.
//!
//! - [`Module`]: A component that declares what it [`produces`]( Module::produces ) and
//! 	[`consumes`]( Module::consumes ) and wires itself up in [`configure`]( Module::configure ).
//! 	Modules are identified by their [`ModuleSignature`]; a [`Capability::Repeatable`]
//! 	module may be installed from several places without error.
//!
//! - [`Assembly`]: The engine. It owns the value store, tracks which modules are
//! 	waiting for which keys, and runs the [`build`]( Assembly::build ).
//!
//! - [`Binder`]: The facade a module receives during `configure`. Reads and writes go
//! 	through it and are checked against the module's declarations. It is only valid
//! 	for the duration of that one call.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc ;
//! use modbind::{ Assembly, Binder, Data, DataKeys, Module, ModuleError, keys };
//!
//! static FOO: Data<i32> = Data::new( "example", "foo" );
//! static DOUBLED: Data<i32> = Data::new( "example", "doubled" );
//!
//! struct Producer ;
//! impl Module for Producer {
//! 	fn namespace( &self ) -> &str { "example" }
//! 	fn name( &self ) -> &str { "producer" }
//! 	fn produces( &self ) -> DataKeys { keys![ FOO ] }
//! 	fn configure( &self, binder: &Binder<'_> ) -> Result<(), ModuleError> {
//! 		FOO.put( binder, 42 )?;
//! 		Ok(())
//! 	}
//! }
//!
//! struct Doubler ;
//! impl Module for Doubler {
//! 	fn namespace( &self ) -> &str { "example" }
//! 	fn name( &self ) -> &str { "doubler" }
//! 	fn produces( &self ) -> DataKeys { keys![ DOUBLED ] }
//! 	fn consumes( &self ) -> DataKeys { keys![ FOO ] }
//! 	fn configure( &self, binder: &Binder<'_> ) -> Result<(), ModuleError> {
//! 		let foo = FOO.get( binder )?;
//! 		DOUBLED.put( binder, foo * 2 )?;
//! 		Ok(())
//! 	}
//! }
//!
//! # fn main() -> Result<(), modbind::Error> {
//! let assembly = Assembly::new([
//! 	Arc::new( Doubler ) as Arc<dyn Module>,
//! 	Arc::new( Producer ),
//! ])?;
//!
//! // Values cannot be read from outside until the build has completed.
//! assert!( FOO.get( &assembly ).is_err() );
//!
//! assembly.build()?;
//! assert_eq!( DOUBLED.get( &assembly )?, 84 );
//! # Ok(())
//! # }
//! ```
//!
//! # Installing Modules During Configuration
//!
//! A module may install the modules it depends on through [`Binder::install`]. Shared
//! dependencies that several modules install should be [`Capability::Repeatable`]:
//!
//! ```
//! # use std::sync::Arc ;
//! # use modbind::{ Assembly, Binder, Capability, Data, DataKeys, Module, ModuleError, keys };
//! static POOL: Data<usize> = Data::new( "example", "pool" );
//!
//! struct Pool ;
//! impl Module for Pool {
//! 	fn namespace( &self ) -> &str { "example" }
//! 	fn name( &self ) -> &str { "pool" }
//! 	fn produces( &self ) -> DataKeys { keys![ POOL ] }
//! 	fn capability( &self ) -> Capability { Capability::Repeatable }
//! 	fn configure( &self, binder: &Binder<'_> ) -> Result<(), ModuleError> {
//! 		Ok( POOL.put( binder, 8 )? )
//! 	}
//! }
//!
//! struct Service( &'static str );
//! impl Module for Service {
//! 	fn namespace( &self ) -> &str { "example" }
//! 	fn name( &self ) -> &str { self.0 }
//! 	fn configure( &self, binder: &Binder<'_> ) -> Result<(), ModuleError> {
//! 		Ok( binder.install( Arc::new( Pool ))? )
//! 	}
//! }
//!
//! let assembly = Assembly::new([
//! 	Arc::new( Service( "users" )) as Arc<dyn Module>,
//! 	Arc::new( Service( "orders" )),
//! ]).unwrap();
//! assembly.build().unwrap();
//! assert_eq!( POOL.get( &assembly ).unwrap(), 8 );
//! assert_eq!( assembly.modules().len(), 3 );
//! ```
//!
//! # Errors
//!
//! Every failure is an [`Error`]. Failures inside a module's `configure` are wrapped
//! in a [`ConfigurationError`] naming the module and the [`Operation`] that failed.
//! The first failure stops the build, and a failed [`Assembly`] cannot be built again.
//!
//! # Logging
//!
//! `modbind` emits [`tracing`]( https://docs.rs/tracing ) events under the
//! `modbind::assembly` and `modbind::binder` targets. It never installs a subscriber.

mod assembly ;
mod binder ;
mod binding ;
mod data ;
mod data_registry ;
mod error ;
mod module ;
mod utils ;

pub use assembly::Assembly ;
pub use binder::Binder ;
pub use data::{ Data, DataKey, DataKeys, DataReader, DataWriter, KeySignature, Value };
pub use module::{ Capability, Module, ModuleError, ModuleSignature };
pub use error::{ ConfigurationError, Declaration, Error, Operation, UnmetDependency };

#[doc( no_inline )]
pub use nonempty_collections::NEVec ;
