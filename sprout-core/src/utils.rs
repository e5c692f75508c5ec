//! Utility functions for the container
//!
//! Naming helpers used to derive canonical bean names, and the per-thread
//! creation tracker used to detect circular dependencies.

/// Naming convention utilities for bean names
pub mod naming {
    /// Converts a PascalCase type name to camelCase for bean naming.
    ///
    /// This is the default bean naming strategy: `UserService` becomes
    /// `userService`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sprout_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("UserService"), "userService");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Extracts the simple name from a full Rust type name.
    ///
    /// Strips the `dyn` keyword, extra trait-object bounds, generic arguments
    /// and the module path.
    ///
    /// ```
    /// use sprout_core::utils::naming::simple_type_name;
    ///
    /// assert_eq!(simple_type_name("my_app::service::UserService"), "UserService");
    /// assert_eq!(simple_type_name("dyn my_app::Greeting + core::marker::Send"), "Greeting");
    /// assert_eq!(simple_type_name("alloc::vec::Vec<my_app::User>"), "Vec");
    /// ```
    pub fn simple_type_name(type_name: &str) -> &str {
        let name = path_only(type_name);
        name.rsplit("::").next().unwrap_or(name).trim()
    }

    /// `dyn a::B + Send` / `a::B<C>` -> `a::B`
    fn path_only(type_name: &str) -> &str {
        let name = type_name.trim();
        let name = name.strip_prefix("dyn ").unwrap_or(name);
        let name = name.split(" + ").next().unwrap_or(name);
        name.split('<').next().unwrap_or(name)
    }

    /// Returns the module path of a full Rust type name (everything before the
    /// simple name). Empty for types declared at the crate root of a bin.
    pub fn module_path_of(type_name: &str) -> &str {
        let name = path_only(type_name);
        match name.rfind("::") {
            Some(idx) => &name[..idx],
            None => "",
        }
    }

    /// Derives the canonical bean name of a type: lower-camel-case of its
    /// simple name.
    pub fn bean_name_of(type_name: &str) -> String {
        to_camel_case(simple_type_name(type_name))
    }

    /// `true` when the string is empty or contains only whitespace.
    pub fn is_blank(s: &str) -> bool {
        s.trim().is_empty()
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::thread::{self, ThreadId};

    /// Tracks beans currently being created to detect circular dependencies.
    ///
    /// Creation chains are kept per calling thread: two threads building the
    /// same singleton at the same time is not a cycle.
    #[derive(Debug, Default)]
    pub struct CreationTracker {
        creating: Mutex<HashMap<ThreadId, Vec<String>>>,
    }

    impl CreationTracker {
        /// Creates a new empty creation tracker.
        pub fn new() -> Self {
            Self {
                creating: Mutex::new(HashMap::new()),
            }
        }

        /// Checks if a bean is currently being created on this thread.
        pub fn is_creating(&self, name: &str) -> bool {
            self.creating
                .lock()
                .get(&thread::current().id())
                .map(|chain| chain.iter().any(|n| n == name))
                .unwrap_or(false)
        }

        /// Marks a bean as being created on this thread.
        ///
        /// Returns `false` if it was already in this thread's chain
        /// (circular dependency detected).
        pub fn start_creating(&self, name: &str) -> bool {
            let mut creating = self.creating.lock();
            let chain = creating.entry(thread::current().id()).or_default();
            if chain.iter().any(|n| n == name) {
                return false;
            }
            chain.push(name.to_string());
            true
        }

        /// Marks a bean as finished being created on this thread.
        pub fn finish_creating(&self, name: &str) {
            let mut creating = self.creating.lock();
            let id = thread::current().id();
            if let Some(chain) = creating.get_mut(&id) {
                if let Some(pos) = chain.iter().rposition(|n| n == name) {
                    chain.remove(pos);
                }
                if chain.is_empty() {
                    creating.remove(&id);
                }
            }
        }

        /// Snapshot of this thread's creation chain, outermost first.
        pub fn current_creating(&self) -> Vec<String> {
            self.creating
                .lock()
                .get(&thread::current().id())
                .cloned()
                .unwrap_or_default()
        }
    }
}
