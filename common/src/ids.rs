/// Declares a `u32` newtype used as an index into an arena `Vec`.
///
/// Arenas flatten the cyclic structures of the engines (cell/net,
/// tree parent/child, path prev/next): the owning direction is the `Vec`,
/// every back-reference is just another index.
#[macro_export]
macro_rules! define_index {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            #[inline(always)]
            pub fn new(id: usize) -> Self {
                Self(id as u32)
            }

            #[inline(always)]
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    define_index!(ProbeId);

    #[test]
    fn roundtrips_through_usize() {
        let id = ProbeId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(format!("{:?}", id), "ProbeId(42)");
    }
}
