//! Declarative macros to reduce boilerplate across the powermon codebase

/// Define a metric enum with automatic `name()`, `ALL` and `all()` implementations
///
/// # Example
/// ```
/// use powermon::metric_enum;
///
/// metric_enum! {
///     pub enum Plane {
///         Package => "package",
///         Core => "pp0",
///     }
/// }
///
/// // Usage
/// let plane = Plane::Package;
/// assert_eq!(plane.name(), "package");
/// assert_eq!(Plane::ALL.len(), 2);
/// assert_eq!(Plane::all(), vec![Plane::Package, Plane::Core]);
/// ```
///
/// Expands to:
/// - An enum with Debug, Clone, Copy, PartialEq, Eq, Hash derives
/// - A `name(&self) -> &'static str` method
/// - An `ALL` slice in declaration order
/// - An `all() -> Vec<Self>` method
#[macro_export]
macro_rules! metric_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $str:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)*
                }
            }

            pub fn all() -> Vec<$name> {
                Self::ALL.to_vec()
            }
        }
    };
}
