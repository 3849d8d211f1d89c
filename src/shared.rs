//! Sharing a value, such as a [`Controller`](crate::controller::Controller),
//! within a thread or across threads.
//!
//! The poll cycle and command callers compete for the same controller. Both
//! sides lock it for the duration of whole exchanges, never for individual
//! fields, through the [`Shared`] trait.

use crate::error::{LockError, LockPoisonedError, LockUnavailableError};
use std::{
	cell::{RefCell, RefMut},
	ops::DerefMut,
	rc::Rc,
	sync::{Arc, Mutex, MutexGuard, TryLockError},
};

/// Any type that can be mutably shared, either within a thread or across threads.
pub trait Shared<T>: Clone {
	/// The type protecting the shared resource while it is locked.
	type Guard<'g>: DerefMut<Target = T>
	where
		Self: 'g;

	/// Create a new instance of the shared type in the unlocked state.
	fn new(value: T) -> Self;

	/// Lock the underlying resource.
	///
	/// In multithreaded contexts, this will block the current thread until the
	/// resource is available. Within a thread, locking an already locked
	/// resource fails with a [`LockUnavailableError`].
	fn lock(&self) -> Result<Self::Guard<'_>, LockError>;

	/// Try to lock the underlying resource without blocking.
	fn try_lock(&self) -> Result<Self::Guard<'_>, LockError>;
}

impl<T> Shared<T> for Rc<RefCell<T>> {
	type Guard<'g> = RefMut<'g, T> where Self: 'g;

	fn new(value: T) -> Self {
		Rc::new(RefCell::new(value))
	}
	fn lock(&self) -> Result<Self::Guard<'_>, LockError> {
		self.try_lock()
	}
	fn try_lock(&self) -> Result<Self::Guard<'_>, LockError> {
		self.try_borrow_mut()
			.map_err(|_| LockUnavailableError.into())
	}
}

impl<T> Shared<T> for Arc<Mutex<T>> {
	type Guard<'g> = MutexGuard<'g, T> where Self: 'g;

	fn new(value: T) -> Self {
		Arc::new(Mutex::new(value))
	}
	fn lock(&self) -> Result<Self::Guard<'_>, LockError> {
		Mutex::lock(self).map_err(|_| LockPoisonedError.into())
	}
	fn try_lock(&self) -> Result<Self::Guard<'_>, LockError> {
		Mutex::try_lock(self).map_err(|err| match err {
			TryLockError::Poisoned(_) => LockPoisonedError.into(),
			TryLockError::WouldBlock => LockUnavailableError.into(),
		})
	}
}
