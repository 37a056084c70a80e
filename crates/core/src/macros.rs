// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Declarative macros for reducing boilerplate.
//!
//! - [`simple_display!`] — `Display` impl mapping enum variants to string literals
//! - [`builder!`] — test builder struct with Default, setters, and `build()`
//! - [`root_job_ctor!`] — production constructor for a fresh, top-level job

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// Unit variants match directly; data-carrying variants use `(..)` to ignore fields.
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Generate a test builder (struct + Default + setters + build).
///
/// All generated items are gated behind `#[cfg(any(test, feature = "test-support"))]`.
///
/// Field groups:
/// - `into { field: Type = default }` — setter uses `impl Into<Type>`
/// - `set { field: Type = default }` — setter takes `Type` directly
/// - `option { field: Type = default }` — builder field is `Option<Type>`,
///   setter wraps in `Some(v.into())`
/// - `computed { field: Type = expr }` — no builder field or setter;
///   value computed at build time
#[macro_export]
macro_rules! builder {
    (
        pub struct $builder:ident => $target:ident {
            $(into {
                $( $into_field:ident : $into_ty:ty = $into_default:expr ),* $(,)?
            })?
            $(set {
                $( $set_field:ident : $set_ty:ty = $set_default:expr ),* $(,)?
            })?
            $(option {
                $( $opt_field:ident : $opt_ty:ty = $opt_default:expr ),* $(,)?
            })?
            $(computed {
                $( $comp_field:ident : $comp_ty:ty = $comp_expr:expr ),* $(,)?
            })?
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $builder {
            $($( $into_field: $into_ty, )*)?
            $($( $set_field: $set_ty, )*)?
            $($( $opt_field: Option<$opt_ty>, )*)?
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $builder {
            fn default() -> Self {
                Self {
                    $($( $into_field: $into_default.into(), )*)?
                    $($( $set_field: $set_default, )*)?
                    $($( $opt_field: $opt_default, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $($(
                pub fn $into_field(mut self, v: impl Into<$into_ty>) -> Self {
                    self.$into_field = v.into();
                    self
                }
            )*)?

            $($(
                pub fn $set_field(mut self, v: $set_ty) -> Self {
                    self.$set_field = v;
                    self
                }
            )*)?

            $($(
                pub fn $opt_field(mut self, v: impl Into<$opt_ty>) -> Self {
                    self.$opt_field = Some(v.into());
                    self
                }
            )*)?

            pub fn build(self) -> $target {
                $target {
                    $($( $into_field: self.$into_field, )*)?
                    $($( $set_field: self.$set_field, )*)?
                    $($( $opt_field: self.$opt_field, )*)?
                    $($( $comp_field: $comp_expr, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $target {
            /// Create a builder with test defaults.
            pub fn builder() -> $builder {
                $builder::default()
            }
        }
    };
}

/// Generate a production constructor for a fresh, top-level job: its own
/// root, no parent, no batch, `Pending` with zero attempts.
///
/// `Job::builder()` is gated behind `test-support`, so every crate that
/// mints its own jobs outside of tests — a plugin's `submit_job`, the
/// conversation manager's summarization job, the entity registry's embed
/// jobs — needs a real constructor to call instead of hand-writing the
/// struct literal. Unlike [`builder!`], this is always compiled.
#[macro_export]
macro_rules! root_job_ctor {
    ($target:ident) => {
        impl $target {
            /// Construct a fresh, top-level job with default priority and
            /// retry budget. `root_job_id` and `parent_job_id` follow from
            /// this being a root: the former equals `id`, the latter is
            /// `None`.
            pub fn new_root(job_type: impl Into<String>, payload: serde_json::Value, now: chrono::DateTime<chrono::Utc>) -> Self {
                let id = $crate::JobId::new();
                Self {
                    id,
                    job_type: job_type.into(),
                    status: $crate::JobStatus::Pending,
                    priority: $crate::JobPriority::Normal,
                    payload,
                    result: None,
                    error: None,
                    attempts: 0,
                    max_attempts: 3,
                    parent_job_id: None,
                    root_job_id: id,
                    batch_id: None,
                    metadata: std::collections::HashMap::new(),
                    created: now,
                    updated: now,
                    scheduled_for: None,
                    started_at: None,
                    completed_at: None,
                }
            }
        }
    };
}
