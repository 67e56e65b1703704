//! Error types
use core::fmt;

/// The macro to define [`ResultCode`].
macro_rules! define_result_code {
    (
        $( #[$meta:meta] )*
        pub enum ResultCode {
            $(
                $( #[$vmeta:meta] )*
                $vname:ident = $vd:expr
            ),* $(,)*
        }
    ) => {
        $( #[$meta] )*
        pub enum ResultCode {
            $(
                $( #[$vmeta] )*
                $vname = $vd
            ),*
        }

        impl ResultCode {
            /// Get the short name of the result code.
            ///
            /// # Examples
            ///
            /// ```
            /// use eventbits_kernel::ResultCode;
            /// assert_eq!(ResultCode::QueueOverflow.as_str(), "QueueOverflow");
            /// ```
            pub fn as_str(self) -> &'static str {
                match self {
                    $(
                        Self::$vname => stringify!($vname),
                    )*
                }
            }
        }

        impl fmt::Debug for ResultCode {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_result_code! {
    /// All result codes (including success) that the kernel can report.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[repr(i8)]
    pub enum ResultCode {
        /// The operation was successful. No additional information is available.
        Success = 0,
        /// The object couldn't be allocated because the kernel heap is
        /// exhausted.
        OutOfMemory = -33,
        /// A target object is in a state that disallows the operation.
        BadObjectState = -41,
        /// A request couldn't be enqueued because there are too many of such
        /// things that already have been enqueued.
        QueueOverflow = -43,
    }
}

impl ResultCode {
    /// Get a flag indicating whether the code represents a failure.
    ///
    /// Failure codes have negative values.
    #[inline]
    pub fn is_err(self) -> bool {
        (self as i8) < 0
    }

    /// Get a flag indicating whether the code represents a success.
    ///
    /// Success codes have non-negative values.
    #[inline]
    pub fn is_ok(self) -> bool {
        !self.is_err()
    }
}

macro_rules! define_error {
    (
        $( #[$meta:meta] )*
        $vis:vis enum $name:ident {
            $(
                $( #[$vmeta:meta] )*
                $vname:ident
            ),* $(,)*
        }
    ) => {
        $( #[$meta] )*
        ///
        /// See [`ResultCode`] for all result codes and generic descriptions.
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(i8)]
        $vis enum $name {
            $(
                $( #[$vmeta] )*
                // Use the same discriminants as `ResultCode` for cost-free
                // conversion
                $vname = ResultCode::$vname as i8
            ),*
        }

        impl fmt::Debug for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Debug::fmt(&ResultCode::from(*self), f)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }

        impl From<$name> for ResultCode {
            #[inline]
            fn from(x: $name) -> Self {
                match x {
                    $(
                        $name::$vname => Self::$vname,
                    )*
                }
            }
        }

        impl From<Result<(), $name>> for ResultCode {
            #[inline]
            fn from(x: Result<(), $name>) -> Self {
                match x {
                    Ok(()) => Self::Success,
                    Err(e) => Self::from(e),
                }
            }
        }
    };
}

define_error! {
    /// Error type for [`EventGroup::create`].
    ///
    /// [`EventGroup::create`]: crate::EventGroup::create
    pub enum CreateEventGroupError {
        /// The port's budget for dynamically allocated event groups is
        /// exhausted.
        OutOfMemory,
    }
}

define_error! {
    /// Error type for [`EventGroup::set_bits_from_isr`] and
    /// [`EventGroup::clear_bits_from_isr`].
    ///
    /// [`EventGroup::set_bits_from_isr`]: crate::EventGroup::set_bits_from_isr
    /// [`EventGroup::clear_bits_from_isr`]: crate::EventGroup::clear_bits_from_isr
    pub enum PendDeferredCallError {
        /// The deferred-call queue is full.
        QueueOverflow,
    }
}

define_error! {
    /// Error type for [`EventGroup::static_buffer`].
    ///
    /// [`EventGroup::static_buffer`]: crate::EventGroup::static_buffer
    pub enum BadObjectStateError {
        /// The event group was not created by
        /// [`EventGroup::create_static`](crate::EventGroup::create_static).
        BadObjectState,
    }
}
