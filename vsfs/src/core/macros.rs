// SPDX-License-Identifier: MIT

/// Wires the error layers into each other and into the top-level error.
///
/// Every layer gets `From<&'static str>` (into its `Other` variant) plus one
/// `From` per wrapped lower layer. The top error gets a `From` per layer.
#[macro_export]
macro_rules! fs_error_wiring {
    (
        $top:ident {
            $($layer_ty:ty => $top_variant:ident),+ $(,)?
        }
        layers {
            $($layer:ident : $($variant:ident($lower:ty)),+ ;)*
        }
    ) => {
        $(
            impl From<$layer_ty> for $top {
                #[inline]
                fn from(e: $layer_ty) -> Self { $top::$top_variant(e) }
            }
        )+

        impl From<&'static str> for $top {
            #[inline]
            fn from(msg: &'static str) -> Self { $top::Other(msg) }
        }

        $(
            impl From<&'static str> for $layer {
                #[inline]
                fn from(msg: &'static str) -> Self { $layer::Other(msg) }
            }
            $(
                impl From<$lower> for $layer {
                    #[inline]
                    fn from(e: $lower) -> Self { $layer::$variant(e) }
                }
            )+
        )*
    };
}

/// `Display` for error types with `msg()` and `source()`: the message, then
/// one `caused by:` line per lower layer.
#[macro_export]
macro_rules! fs_error_display {
    ($($t:ty),+ $(,)?) => {
        $(
            impl core::fmt::Display for $t {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    write!(f, "{}", self.msg())?;
                    let mut current = self.source();
                    while let Some(src) = current {
                        write!(f, "\n  caused by: {}", src.msg())?;
                        current = src.source();
                    }
                    Ok(())
                }
            }
        )+
    };
}

/// Returns `Err($err.into())` from the enclosing function unless `$cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}
