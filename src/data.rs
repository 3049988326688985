//! Typed data contracts shared between modules.
//!
//! A [`Data`] handle names a value of type `T` that exactly one module produces and
//! any number of modules consume. Handles are declared once as `static` items and
//! referenced as `&'static dyn DataKey` from [`Module::produces`] and
//! [`Module::consumes`]. The `'static` bound is what keeps a handle from being
//! conjured up inside a function body: two handles are the same contract only if
//! they are the same static.
//!
//! ```
//! use modbind::{ Data, keys, DataKeys };
//!
//! static PORT: Data<u16> = Data::new( "my_app::net", "port" );
//! static HOST: Data<String> = Data::new( "my_app::net", "host" );
//!
//! let declared: DataKeys = keys![ PORT, HOST ];
//! assert_eq!( declared.len(), 2 );
//! assert_eq!( PORT.signature().to_string(), "my_app::net:port" );
//! ```
//!
//! [`Module::produces`]: crate::Module::produces
//! [`Module::consumes`]: crate::Module::consumes

use std::any::{ Any, TypeId, type_name };
use std::fmt ;
use std::hash::{ Hash, Hasher };
use std::marker::PhantomData ;
use std::sync::Arc ;
use std::sync::atomic::{ AtomicU64, Ordering };
use once_cell::sync::OnceCell ;

use crate::Error ;



/// Type-erased value held by the store.
pub type Value = Arc<dyn Any + Send + Sync>;

/// A list of declared data keys, as returned by [`Module::produces`]( crate::Module::produces )
/// and [`Module::consumes`]( crate::Module::consumes ).
pub type DataKeys = Vec<&'static dyn DataKey>;

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new( 1 );

/// The `( namespace, name )` identity of a data key.
///
/// Two distinct handles carrying the same signature are a clash and are rejected
/// when the second one is first seen by an [`Assembly`]( crate::Assembly ).
#[derive( Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord )]
pub struct KeySignature {
    namespace: &'static str,
    name: &'static str,
}

impl KeySignature {
    /// Creates a key signature.
    pub const fn new( namespace: &'static str, name: &'static str ) -> Self {
        Self { namespace, name }
    }

    /// The namespace the key was declared in, usually `module_path!()`.
    #[inline] pub fn namespace( &self ) -> &'static str { self.namespace }

    /// The key's name within its namespace.
    #[inline] pub fn name( &self ) -> &'static str { self.name }
}

impl fmt::Display for KeySignature {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        write!( f, "{}:{}", self.namespace, self.name )
    }
}

/// Type-erased view of a [`Data`] handle.
///
/// Implemented only by [`Data`]; used wherever keys of different payload types
/// need to sit in the same collection.
pub trait DataKey: fmt::Display + fmt::Debug + Send + Sync {
    /// The `( namespace, name )` identity of this key.
    fn signature( &self ) -> KeySignature ;

    /// Name of the payload type, for diagnostics.
    fn type_name( &self ) -> &'static str ;

    /// Identity of the payload type. Values stored under this key must have it.
    fn payload_type_id( &self ) -> TypeId ;

    /// Process-unique sequence number, for diagnostics.
    fn sequence( &self ) -> u64 ;
}

/// Read access to stored values.
///
/// Implemented by [`Binder`]( crate::Binder ) during configuration and by
/// [`Assembly`]( crate::Assembly ) once its build has completed. Modules normally
/// go through [`Data::get`] rather than calling this directly.
pub trait DataReader {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    /// Fails if the value is absent or if the reader does not permit the access.
    fn get_data( &self, key: &'static dyn DataKey ) -> Result<Value, Error> ;
}

/// Write access to the store.
///
/// Implemented by [`Binder`]( crate::Binder ). Modules normally go through
/// [`Data::put`] rather than calling this directly.
pub trait DataWriter {
    /// Stores `value` under `key`.
    ///
    /// # Errors
    /// Fails if a value is already stored or if the writer does not permit the access.
    fn put_data( &self, key: &'static dyn DataKey, value: Value ) -> Result<(), Error> ;
}

/// A typed, named contract for a value of type `T`.
///
/// Declare handles as statics:
///
/// ```
/// # use modbind::Data ;
/// static DATABASE_URL: Data<String> = Data::new( module_path!(), "database-url" );
/// ```
///
/// A handle created on the stack cannot be handed to a module or read through,
/// since every operation requires `&'static self`.
pub struct Data<T> {
    signature: KeySignature,
    sequence: OnceCell<u64>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Data<T> {
    /// Creates a new data handle.
    ///
    /// `namespace` should identify the declaring package or module path so that
    /// independently authored keys with the same `name` do not collide.
    pub const fn new( namespace: &'static str, name: &'static str ) -> Self {
        Self {
            signature: KeySignature::new( namespace, name ),
            sequence: OnceCell::new(),
            _payload: PhantomData,
        }
    }

    /// The `( namespace, name )` identity of this handle.
    #[inline] pub fn signature( &self ) -> KeySignature { self.signature }
}

impl<T: Clone + Send + Sync + 'static> Data<T> {

    /// Reads the value stored under this handle.
    ///
    /// # Errors
    /// Propagates any error from `reader` and returns [`Error::TypeMismatch`] if the
    /// stored value is not a `T`.
    pub fn get<R: DataReader + ?Sized>( &'static self, reader: &R ) -> Result<T, Error> {
        let value = reader.get_data( self )?;
        ( *value ).downcast_ref::<T>()
            .cloned()
            .ok_or( Error::TypeMismatch( self ))
    }

    /// Stores `value` under this handle.
    ///
    /// # Errors
    /// Propagates any error from `writer`.
    pub fn put<W: DataWriter + ?Sized>( &'static self, writer: &W, value: T ) -> Result<(), Error> {
        writer.put_data( self, Arc::new( value ))
    }

}

impl<T: 'static> DataKey for Data<T> {
    fn signature( &self ) -> KeySignature { self.signature }
    fn type_name( &self ) -> &'static str { type_name::<T>() }
    fn payload_type_id( &self ) -> TypeId { TypeId::of::<T>() }
    fn sequence( &self ) -> u64 {
        *self.sequence.get_or_init(|| NEXT_SEQUENCE.fetch_add( 1, Ordering::Relaxed ))
    }
}

impl<T: 'static> fmt::Display for Data<T> {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        write!( f, "Data[{}]({}#{})", type_name::<T>(), self.signature, self.sequence() )
    }
}

impl<T: 'static> fmt::Debug for Data<T> {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.debug_struct( "Data" )
            .field( "type", &type_name::<T>() )
            .field( "signature", &self.signature )
            .field( "sequence", &self.sequence.get() )
            .finish()
    }
}

/// Builds a [`DataKeys`] list from static [`Data`] handles.
///
/// ```
/// # use modbind::{ Data, keys };
/// static A: Data<i32> = Data::new( "doc", "a" );
/// static B: Data<&'static str> = Data::new( "doc", "b" );
/// assert_eq!( keys![ A, B ].len(), 2 );
/// assert!( keys![].is_empty() );
/// ```
#[macro_export]
macro_rules! keys {
    () => { $crate::DataKeys::new() };
    ( $( $key:expr ),+ $(,)? ) => {
        ::std::vec![ $( &$key as &'static dyn $crate::DataKey ),+ ]
    };
}

/// Handle identity: two references are the same key only if they point at the same static.
#[derive( Copy, Clone )]
pub(crate) struct KeyRef( pub(crate) &'static dyn DataKey );

impl KeyRef {
    #[inline] fn address( self ) -> *const () { std::ptr::from_ref( self.0 ).cast::<()>() }
    #[inline] pub(crate) fn signature( self ) -> KeySignature { self.0.signature() }

    /// Rejects a value that is not of this key's payload type.
    pub(crate) fn check_payload( self, value: &Value ) -> Result<(), Error> {
        let value: &dyn Any = &**value ;
        match value.type_id() == self.0.payload_type_id() {
            true => Ok(()),
            false => Err( Error::TypeMismatch( self.0 )),
        }
    }
}

impl PartialEq for KeyRef {
    fn eq( &self, other: &Self ) -> bool { std::ptr::eq( self.address(), other.address() )}
}
impl Eq for KeyRef {}

impl Hash for KeyRef {
    fn hash<H: Hasher>( &self, state: &mut H ) { self.address().hash( state )}
}

impl fmt::Display for KeyRef {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result { fmt::Display::fmt( self.0, f )}
}

impl fmt::Debug for KeyRef {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result { fmt::Debug::fmt( self.0, f )}
}
