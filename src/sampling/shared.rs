// Interrupt-shared reading cell
//
// ISRs store with set()/update(); the main loop reads with get()/take().
// Critical section guards targets without atomic RMW (riscv32imc), and
// the cell is const-constructible so it can sit in a static.

use core::cell::Cell;

use critical_section::Mutex;

pub struct Shared<T: Copy> {
    inner: Mutex<Cell<T>>,
}

impl<T: Copy> Shared<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Cell::new(value)),
        }
    }

    pub fn get(&self) -> T {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    pub fn set(&self, value: T) {
        critical_section::with(|cs| self.inner.borrow(cs).set(value));
    }

    pub fn replace(&self, value: T) -> T {
        critical_section::with(|cs| self.inner.borrow(cs).replace(value))
    }

    /// Apply `f` to the value in place and return what `f` returns.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let mut value = cell.get();
            let out = f(&mut value);
            cell.set(value);
            out
        })
    }
}

impl<T: Copy + Default> Shared<T> {
    pub fn take(&self) -> T {
        self.replace(T::default())
    }
}

impl<T: Copy + Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
