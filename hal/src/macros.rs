#![macro_use]

macro_rules! typestate {
    ($name:ident, $doc:expr) => {
        paste::paste! {
            #[doc = "[Typestate] for " $doc "."]
            ///
            /// [Typestate]: https://docs.rust-embedded.org/book/static-guarantees/typestate-programming.html
            #[derive(Debug, PartialEq, Eq, Clone, Copy)]
            #[cfg_attr(feature = "defmt", derive(defmt::Format))]
            pub struct $name {
                _priv: (),
            }
        }

        impl $name {
            #[allow(dead_code)]
            pub(crate) const fn new() -> Self {
                Self { _priv: () }
            }
        }
    };
}

// The register names are shared by every F3 PAC, the field accessor names are
// not, so bit-level access goes through masks.

/// Set the bits of `$mask` in a PAC register.
macro_rules! set_bits {
    ($reg:expr, $mask:expr) => {
        $reg.modify(|r, w| unsafe { w.bits(r.bits() | ($mask)) })
    };
}

/// Clear the bits of `$mask` in a PAC register.
macro_rules! clear_bits {
    ($reg:expr, $mask:expr) => {
        $reg.modify(|r, w| unsafe { w.bits(r.bits() & !($mask)) })
    };
}

/// Replace the bits of `$mask` in a PAC register with `$val`.
macro_rules! write_bits {
    ($reg:expr, $mask:expr, $val:expr) => {
        $reg.modify(|r, w| unsafe { w.bits((r.bits() & !($mask)) | (($val) & ($mask))) })
    };
}
