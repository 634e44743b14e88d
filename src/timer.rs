// SPDX-License-Identifier: MPL-2.0

//! Slide deadlines.
//!
//! A deadline fires once per arming. The slideshow polls it at the top of
//! every iteration and re-arms it after each swap.

use std::{cell::Cell, rc::Rc, time::Duration};

use calloop::{
    LoopHandle, RegistrationToken,
    timer::{TimeoutAction, Timer},
};

use crate::error::Error;

pub trait Deadline {
    /// Start waiting for the next interval.
    ///
    /// # Errors
    ///
    /// Fails if the deadline cannot be scheduled; it will then never fire.
    fn arm(&mut self) -> Result<(), Error>;

    /// Consume the expiry signal, if the deadline has passed.
    fn take_expired(&mut self) -> bool;
}

/// A one-shot calloop timer per slide interval.
pub struct SlideTimer<D: 'static> {
    handle: LoopHandle<'static, D>,
    interval: Duration,
    expired: Rc<Cell<bool>>,
    token: Option<RegistrationToken>,
}

impl<D: 'static> SlideTimer<D> {
    pub fn new(handle: LoopHandle<'static, D>, interval: Duration) -> Self {
        Self {
            handle,
            interval,
            expired: Rc::new(Cell::new(false)),
            token: None,
        }
    }

    fn disarm(&mut self) {
        if let Some(token) = self.token.take() {
            // A fired timer has already dropped its own source.
            if !self.expired.get() {
                self.handle.remove(token);
            }
        }
    }
}

impl<D: 'static> Deadline for SlideTimer<D> {
    fn arm(&mut self) -> Result<(), Error> {
        self.disarm();
        self.expired.set(false);

        let expired = Rc::clone(&self.expired);
        let interval = self.interval;
        let token = self
            .handle
            .insert_source(Timer::from_duration(interval), move |_, _, _| {
                tracing::debug!(?interval, "slide deadline reached");
                expired.set(true);
                TimeoutAction::Drop
            })
            .map_err(|why| Error::Deadline(why.error))?;

        self.token = Some(token);
        Ok(())
    }

    fn take_expired(&mut self) -> bool {
        if !self.expired.get() {
            return false;
        }

        self.expired.set(false);
        self.token = None;
        true
    }
}

impl<D: 'static> Drop for SlideTimer<D> {
    fn drop(&mut self) {
        self.disarm();
    }
}
