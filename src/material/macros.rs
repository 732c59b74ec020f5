/// Generates getter/setter pairs for plain `Copy` settings.
///
/// Setters only bump the material version when the value actually changes,
/// so re-assigning the same value does not force a uniform rebind.
macro_rules! impl_setting_accessors {
    (
        $owner:ident {
            $( $(#[$meta:meta])* ($field:ident, $setter:ident, $ty:ty) ),* $(,)?
        }
    ) => {
        impl $owner {
            $(
                $(#[$meta])*
                #[must_use]
                pub fn $field(&self) -> $ty {
                    self.settings.$field
                }

                pub fn $setter(&mut self, value: $ty) {
                    if self.settings.$field != value {
                        self.settings.$field = value;
                        self.version.changed();
                    }
                }
            )*
        }
    };
}

pub(crate) use impl_setting_accessors;
