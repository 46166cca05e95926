//! Transition declarations between state types.
//!
//! A state type declares that it can hand over to another state type by
//! implementing [`Transit<To>`] and listing `To` in its
//! [`State::transitions`] table. The driver looks requests up in that table by
//! the target's `TypeId`.

use super::error::StateError;
use super::state::State;
use crate::driver::lifecycle::ErasedState;
use crate::driver::Controller;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Capability of a state to produce its successor of type `To`.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use waymark::core::{State, StateError, Transit, Transitions};
/// use waymark::driver::Controller;
///
/// struct Closed { controller: Controller }
/// struct Open { controller: Controller }
///
/// #[async_trait]
/// impl State for Closed {
///     fn transitions(table: &mut Transitions<Self>) {
///         table.allow::<Open>();
///     }
/// }
///
/// #[async_trait]
/// impl State for Open {}
///
/// #[async_trait]
/// impl Transit<Open> for Closed {
///     async fn create_next(&mut self, controller: Controller) -> Result<Open, StateError> {
///         Ok(Open { controller })
///     }
/// }
///
/// assert!(Transitions::<Closed>::collect().declares::<Open>());
/// ```
#[async_trait]
pub trait Transit<To: State>: State {
    /// Runs before the current state is exited. A failure aborts the
    /// transition: the current state is not exited and `To` is never built.
    async fn before_exit(&mut self, _cancel: &CancellationToken) -> Result<(), StateError> {
        Ok(())
    }

    /// Build the successor, bound to the same driver through `controller`.
    async fn create_next(&mut self, controller: Controller) -> Result<To, StateError>;
}

/// Type marker of a requested target state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Target {
    id: TypeId,
    name: &'static str,
}

impl Target {
    pub fn of<T: State>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Rust type name of the target.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub(crate) type BeforeExitFn<S> =
    for<'a> fn(&'a mut S, &'a CancellationToken) -> BoxFuture<'a, Result<(), StateError>>;

pub(crate) type CreateNextFn<S> =
    for<'a> fn(&'a mut S, Controller) -> BoxFuture<'a, Result<Box<dyn ErasedState>, StateError>>;

pub(crate) struct Route<S> {
    pub(crate) before_exit: BeforeExitFn<S>,
    pub(crate) create_next: CreateNextFn<S>,
}

impl<S> Clone for Route<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Route<S> {}

/// Transition table of a single state type, keyed by target type.
pub struct Transitions<S> {
    routes: HashMap<TypeId, (Target, Route<S>)>,
}

impl<S: State> Transitions<S> {
    /// Collect the table declared by `S::transitions`.
    pub fn collect() -> Self {
        let mut table = Self {
            routes: HashMap::new(),
        };
        S::transitions(&mut table);
        table
    }

    /// Declare `To` as a valid successor of `S`.
    pub fn allow<To>(&mut self) -> &mut Self
    where
        S: Transit<To>,
        To: State,
    {
        let route = Route {
            before_exit: before_exit::<S, To>,
            create_next: create_next::<S, To>,
        };
        self.routes
            .insert(TypeId::of::<To>(), (Target::of::<To>(), route));
        self
    }

    /// Check whether `To` has been declared.
    pub fn declares<To: State>(&self) -> bool {
        self.routes.contains_key(&TypeId::of::<To>())
    }

    /// Declared targets, in no particular order.
    pub fn targets(&self) -> impl Iterator<Item = Target> + '_ {
        self.routes.values().map(|(target, _)| *target)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn route(&self, target: TypeId) -> Option<Route<S>> {
        self.routes.get(&target).map(|(_, route)| *route)
    }
}

fn before_exit<'a, S, To>(
    source: &'a mut S,
    cancel: &'a CancellationToken,
) -> BoxFuture<'a, Result<(), StateError>>
where
    S: Transit<To>,
    To: State,
{
    Box::pin(async move { Transit::<To>::before_exit(source, cancel).await })
}

fn create_next<'a, S, To>(
    source: &'a mut S,
    controller: Controller,
) -> BoxFuture<'a, Result<Box<dyn ErasedState>, StateError>>
where
    S: Transit<To>,
    To: State,
{
    Box::pin(async move {
        let next = Transit::<To>::create_next(source, controller).await?;
        Ok(Box::new(next) as Box<dyn ErasedState>)
    })
}
