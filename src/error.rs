//! Error types for installation, building, and data access.
//!
//! Every failure is one variant of [`Error`]. Failures that happen inside a
//! module's configuration call are additionally wrapped in a
//! [`ConfigurationError`] naming the module and the [`Operation`] that failed.

use std::sync::Arc ;
use itertools::Itertools ;
use nonempty_collections::NEVec ;
use thiserror::Error ;

use crate::data::{ DataKey, KeySignature };
use crate::module::ModuleSignature ;



/// Errors produced by an [`Assembly`]( crate::Assembly ) and its [`Binder`]( crate::Binder )s.
///
/// Errors are cheap to clone so that the first error seen during a configuration
/// call can be both tracked and returned.
#[derive( Debug, Clone, Error )]
pub enum Error {

    /// A module with the same signature was already installed and neither side is
    /// [`Capability::Repeatable`]( crate::Capability::Repeatable ).
    #[error( "module '{0}': already added" )]
    AlreadyAdded( ModuleSignature ),

    /// A module listed the same key twice in one of its declarations.
    #[error( "module '{module}': failed to convert {declaration} to set: duplicate key '{key}'" )]
    DuplicateDeclaration { module: ModuleSignature, declaration: Declaration, key: KeySignature },

    /// Two modules declare that they produce the same key.
    #[error( "duplicate producer for data key '{key}': modules '{existing}' and '{module}' both declare they produce it" )]
    DuplicateProducer { key: KeySignature, existing: ModuleSignature, module: ModuleSignature },

    /// Two distinct handles share one `( namespace, name )` identity.
    #[error( "data key signature clash: '{signature}' conflicts with existing key '{existing}' (#{existing_sequence} vs #{sequence})" )]
    SignatureClash { signature: KeySignature, existing: String, existing_sequence: u64, sequence: u64 },

    /// A binder operation was invoked outside of its module's configuration call.
    #[error( "{0}: can only be called during configuration phase" )]
    OutsideConfiguration( Operation ),

    /// [`Assembly::build`]( crate::Assembly::build ) was called more than once.
    #[error( "build: can only be called once" )]
    AlreadyBuilt,

    /// A binding was asked to configure its module a second time.
    #[error( "configure: can only be called once" )]
    AlreadyConfigured,

    /// Top-level installation after [`Assembly::build`]( crate::Assembly::build ) has been called.
    #[error( "install: can only be called before build" )]
    BuildStarted,

    /// External read before a successful build.
    #[error( "get: can only be called after build has completed successfully" )]
    NotBuilt,

    /// A module touched a key it did not declare.
    #[error( "module '{module}' did not declare '{key}' in {declaration}" )]
    UndeclaredKey { module: ModuleSignature, key: KeySignature, declaration: Declaration },

    /// No value has been stored under the key.
    #[error( "data key '{0}': no value found" )]
    MissingValue( &'static dyn DataKey ),

    /// A value was already stored under the key.
    #[error( "data key '{0}': already set" )]
    AlreadySet( &'static dyn DataKey ),

    /// A value read or written under the key is not of the key's payload type.
    #[error( "data key '{0}': type mismatch, expected {}", .0.type_name() )]
    TypeMismatch( &'static dyn DataKey ),

    /// A module returned successfully without producing every key it declared.
    #[error( "module did not produce all declared keys: [{}]", .0.iter().into_iter().join( ", " ))]
    NotProduced( NEVec<KeySignature> ),

    /// The ready queue drained while modules were still waiting on keys nobody produced.
    #[error( "build incomplete: unmet data keys [{}]", .0.iter().into_iter().join( ", " ))]
    Unresolved( NEVec<UnmetDependency> ),

    /// A failure inside a module's configuration call.
    #[error( transparent )]
    Configuration( Box<ConfigurationError> ),

    /// An operation attempted after an earlier operation of the same call had failed.
    #[error( "{operation}: failed due to previous error: {previous}" )]
    FailFast { operation: Operation, previous: Box<Error> },

    /// An error returned by a module's own code.
    #[error( transparent )]
    Module( Arc<dyn std::error::Error + Send + Sync> ),

}

impl Error {
    /// The configuration context of this error, if it was raised during a module's configuration.
    pub fn configuration( &self ) -> Option<&ConfigurationError> {
        match self {
            Self::Configuration( err ) => Some( err ),
            _ => None,
        }
    }
}

/// A failure inside a module's configuration call, with the module and operation attached.
#[derive( Debug, Clone, Error )]
#[error( "module '{module}' {operation}: {source}" )]
pub struct ConfigurationError {
    /// The module whose configuration failed.
    pub module: ModuleSignature,
    /// The operation that failed.
    pub operation: Operation,
    /// The underlying cause.
    pub source: Error,
}

impl From<ConfigurationError> for Error {
    fn from( err: ConfigurationError ) -> Self { Self::Configuration( Box::new( err ))}
}

/// The module-facing operation an error is attributed to.
#[derive( Copy, Clone, Debug, PartialEq, Eq, Hash )]
pub enum Operation {
    /// [`Binder::install`]( crate::Binder::install )
    Install,
    /// A read through the binder.
    Get,
    /// A write through the binder.
    Put,
    /// The module's own [`Module::configure`]( crate::Module::configure ) call.
    Configure,
}

impl std::fmt::Display for Operation {
    fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
        match self {
            Self::Install => write!( f, "install" ),
            Self::Get => write!( f, "get" ),
            Self::Put => write!( f, "put" ),
            Self::Configure => write!( f, "configure" ),
        }
    }
}

/// Which of a module's declarations an error refers to.
#[derive( Copy, Clone, Debug, PartialEq, Eq, Hash )]
pub enum Declaration {
    Produces,
    Consumes,
}

impl std::fmt::Display for Declaration {
    fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
        match self {
            Self::Produces => write!( f, "produces" ),
            Self::Consumes => write!( f, "consumes" ),
        }
    }
}

/// A key nobody produced, with the modules left waiting on it in install order.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct UnmetDependency {
    pub key: KeySignature,
    pub waiting: Vec<ModuleSignature>,
}

impl std::fmt::Display for UnmetDependency {
    fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
        write!( f, "'{}' (needed by {})", self.key, self.waiting.iter().map(| module | format!( "'{}'", module )).join( ", " ))
    }
}
