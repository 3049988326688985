use nonempty_collections::NEVec ;
use pipe_trait::Pipe ;



/// Collects `items` into a non-empty vector, or `None` if there are none.
pub(crate) fn non_empty<T>( items: impl IntoIterator<Item = T> ) -> Option<NEVec<T>> {
    let mut items = items.into_iter();
    items.next()?
        .pipe( NEVec::new )
        .pipe(| mut collected | {
            items.for_each(| item | collected.push( item ));
            Some( collected )
        })
}

#[cfg( test )]
mod tests {
    use super::* ;

    #[test]
    fn non_empty_of_nothing_is_none() {
        assert!( non_empty( Vec::<u8>::new() ).is_none() );
    }

    #[test]
    fn non_empty_keeps_order() {
        let collected = non_empty([ 3, 1, 2 ]).unwrap();
        assert_eq!( collected.iter().into_iter().copied().collect::<Vec<_>>(), vec![ 3, 1, 2 ]);
        assert_eq!( *collected.first(), 3 );
    }
}
