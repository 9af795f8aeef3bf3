//! Ownership of engine-allocated objects.
//!
//! Objects handed out by the engine live outside Rust's allocator and must be
//! deleted explicitly. A [`Lease`] owns one such object and releases it exactly
//! once when dropped. Release order between objects follows drop order:
//! struct fields drop in declaration order, locals in reverse declaration order,
//! so a session declares `renderer, drivers, artboard, file` and initialization
//! acquires them in the opposite order.

use std::fmt;
use std::ops::{Deref, DerefMut};

use log::debug;

/// An object whose storage is owned by the engine.
pub trait NativeObject {
    /// Short kind label used in diagnostics ("file", "artboard", ...).
    fn kind(&self) -> &'static str;

    /// Delete the object inside the engine.
    fn release(self: Box<Self>);
}

/// Exclusive owner of a single native object.
pub struct Lease<T: ?Sized + NativeObject> {
    // `None` only once released.
    object: Option<Box<T>>,
}

impl<T: ?Sized + NativeObject> Lease<T> {
    pub fn new(object: Box<T>) -> Self {
        Self {
            object: Some(object),
        }
    }

    /// Release now instead of at end of scope.
    pub fn release(mut self) {
        self.release_object();
    }

    fn release_object(&mut self) {
        if let Some(object) = self.object.take() {
            debug!("releasing {}", object.kind());
            object.release();
        }
    }

    fn object(&self) -> &T {
        self.object
            .as_deref()
            .expect("lease accessed after release")
    }
}

impl<T: ?Sized + NativeObject> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.object()
    }
}

impl<T: ?Sized + NativeObject> DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.object
            .as_deref_mut()
            .expect("lease accessed after release")
    }
}

impl<T: ?Sized + NativeObject> Drop for Lease<T> {
    fn drop(&mut self) {
        self.release_object();
    }
}

impl<T: ?Sized + NativeObject> fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.object.as_deref().map(|object| object.kind());
        f.debug_tuple("Lease").field(&kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Tracked {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl NativeObject for Tracked {
        fn kind(&self) -> &'static str {
            self.name
        }

        fn release(self: Box<Self>) {
            self.log.borrow_mut().push(self.name);
        }
    }

    fn tracked(name: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> Lease<Tracked> {
        Lease::new(Box::new(Tracked {
            name,
            log: Rc::clone(log),
        }))
    }

    #[test]
    fn releases_once_on_drop() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let _file = tracked("file", &log);
        }
        assert_eq!(*log.borrow(), vec!["file"]);
    }

    #[test]
    fn explicit_release_does_not_double_release() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let lease = tracked("renderer", &log);
        lease.release();
        assert_eq!(*log.borrow(), vec!["renderer"]);
    }

    #[test]
    fn lease_derefs_to_the_live_object() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut lease = tracked("artboard", &log);
        assert_eq!(lease.kind(), "artboard");
        lease.name = "artboard-2";
        assert_eq!(format!("{lease:?}"), "Lease(Some(\"artboard-2\"))");
        drop(lease);
        assert_eq!(*log.borrow(), vec!["artboard-2"]);
    }

    #[test]
    fn early_return_releases_in_reverse_acquisition_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let build = |fail: bool| -> Result<(), ()> {
            let _file = tracked("file", &log);
            let _artboard = tracked("artboard", &log);
            if fail {
                return Err(());
            }
            let _renderer = tracked("renderer", &log);
            Ok(())
        };
        assert!(build(true).is_err());
        assert_eq!(*log.borrow(), vec!["artboard", "file"]);
    }

    #[test]
    fn struct_fields_release_in_declaration_order() {
        struct Owned {
            _renderer: Lease<Tracked>,
            _artboard: Lease<Tracked>,
            _file: Lease<Tracked>,
        }
        let log = Rc::new(RefCell::new(Vec::new()));
        let file = tracked("file", &log);
        let artboard = tracked("artboard", &log);
        let renderer = tracked("renderer", &log);
        drop(Owned {
            _renderer: renderer,
            _artboard: artboard,
            _file: file,
        });
        assert_eq!(*log.borrow(), vec!["renderer", "artboard", "file"]);
    }
}
