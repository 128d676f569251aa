//! Flow cookie generation and reservation.
//!
//! Each bridge hands out 64-bit cookies that partition flow-table
//! ownership between the agent and its extensions. Cookies are drawn
//! at random and tracked so no two owners on the same bridge ever
//! share one.

use std::collections::HashSet;

/// Generates a random 64-bit flow cookie.
pub fn generate_random_cookie() -> u64 {
    rand::random::<u64>()
}

/// Tracks cookies reserved on one bridge.
#[derive(Debug, Default)]
pub struct CookieAllocator {
    reserved: HashSet<u64>,
}

impl CookieAllocator {
    /// Creates an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves and returns a cookie not yet in use on this bridge.
    pub fn request(&mut self) -> u64 {
        let mut cookie = generate_random_cookie();
        while self.reserved.contains(&cookie) {
            cookie = generate_random_cookie();
        }
        self.reserved.insert(cookie);
        cookie
    }

    /// Reserves a specific cookie. Returns false if already reserved.
    pub fn reserve(&mut self, cookie: u64) -> bool {
        self.reserved.insert(cookie)
    }

    /// Releases a previously reserved cookie. Returns false if it was
    /// not reserved.
    pub fn release(&mut self, cookie: u64) -> bool {
        self.reserved.remove(&cookie)
    }

    /// Returns true if the cookie is currently reserved.
    pub fn is_reserved(&self, cookie: u64) -> bool {
        self.reserved.contains(&cookie)
    }

    /// Returns the number of reserved cookies.
    pub fn len(&self) -> usize {
        self.reserved.len()
    }

    /// Returns true if no cookies are reserved.
    pub fn is_empty(&self) -> bool {
        self.reserved.is_empty()
    }
}
