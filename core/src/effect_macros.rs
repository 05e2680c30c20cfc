//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants, particularly
//! for storage operations and debounced writes.

/// Create an `Effect::Storage` with a `Get` operation
///
/// # Example
///
/// ```rust,ignore
/// use basket_core::storage_get;
///
/// storage_get! {
///     store: env.storage,
///     key: "GROCERY_LIST",
///     on_success: |value| Some(ListAction::Loaded { value }),
///     on_error: |error| Some(ListAction::LoadFailed { error: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! storage_get {
    (
        store: $store:expr,
        key: $key:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::Storage($crate::effect::StorageOperation::Get {
            store: ::std::sync::Arc::clone(&$store),
            key: ::std::string::ToString::to_string(&$key),
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::Storage` with a `Set` operation
///
/// # Example
///
/// ```rust,ignore
/// use basket_core::storage_set;
///
/// storage_set! {
///     store: env.storage,
///     key: "GROCERY_LIST",
///     value: json,
///     on_success: || Some(ListAction::Persisted),
///     on_error: |error| Some(ListAction::PersistFailed { error: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! storage_set {
    (
        store: $store:expr,
        key: $key:expr,
        value: $value:expr,
        on_success: || $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::Storage($crate::effect::StorageOperation::Set {
            store: ::std::sync::Arc::clone(&$store),
            key: ::std::string::ToString::to_string(&$key),
            value: $value,
            on_success: ::std::boxed::Box::new(move |()| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::Debounce` around another effect
///
/// # Example
///
/// ```rust,ignore
/// use basket_core::debounce;
/// use std::time::Duration;
///
/// debounce! {
///     id: "persist-list",
///     duration: Duration::from_millis(500),
///     effect: write_effect
/// }
/// ```
#[macro_export]
macro_rules! debounce {
    (
        id: $id:expr,
        duration: $duration:expr,
        effect: $effect:expr
    ) => {
        $crate::effect::Effect::Debounce {
            id: $crate::effect::EffectId::new($id),
            duration: $duration,
            effect: ::std::boxed::Box::new($effect),
        }
    };
}

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use basket_core::async_effect;
///
/// async_effect! {
///     tokio::time::sleep(Duration::from_millis(400)).await;
///     Some(ListAction::DeleteItem { list, index })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use basket_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_millis(400),
///     action: ListAction::Flush
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
