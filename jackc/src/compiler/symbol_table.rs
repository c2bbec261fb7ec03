use std::collections::HashMap;

use log::trace;
use vm_writer::Segment;

/// Declaration category of a variable. Each kind has its own index space.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    pub fn segment(self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }

    fn is_class_level(self) -> bool {
        matches!(self, Kind::Static | Kind::Field)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub type_name: String,
    pub kind: Kind,
    pub index: u16,
}

/// Returned by `SymbolTable::define` when the name already exists in the
/// target scope.
#[derive(Debug, PartialEq)]
pub struct DuplicateSymbol(pub String);

type SymbolMap = HashMap<String, Symbol>;

#[derive(Default)]
struct Scope {
    symbols: SymbolMap,
    counts: HashMap<Kind, u16>,
}

impl Scope {
    fn clear(&mut self) {
        self.symbols.clear();
        self.counts.clear();
    }

    fn count(&self, kind: Kind) -> u16 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Default)]
pub struct SymbolTable {
    class_scope: Scope,
    subroutine_scope: Scope,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards every argument and local and resets their counters.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
    }

    /// Adds `name` to the scope owning `kind` and returns its index.
    pub fn define(
        &mut self,
        name: &str,
        type_name: &str,
        kind: Kind,
    ) -> Result<u16, DuplicateSymbol> {
        let scope = if kind.is_class_level() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        };

        if scope.symbols.contains_key(name) {
            return Err(DuplicateSymbol(name.to_owned()));
        }

        let counter = scope.counts.entry(kind).or_insert(0);
        let index = *counter;
        *counter += 1;

        trace!("define {} {} as {:?} {}", type_name, name, kind, index);
        scope.symbols.insert(
            name.to_owned(),
            Symbol {
                type_name: type_name.to_owned(),
                kind,
                index,
            },
        );
        Ok(index)
    }

    /// Resolves `name`, subroutine scope first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        [&self.subroutine_scope, &self.class_scope]
            .into_iter()
            .find_map(|scope| scope.symbols.get(name))
    }

    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.lookup(name).map(|s| s.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|s| s.type_name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.lookup(name).map(|s| s.index)
    }

    pub fn var_count(&self, kind: Kind) -> u16 {
        if kind.is_class_level() {
            self.class_scope.count(kind)
        } else {
            self.subroutine_scope.count(kind)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_point_class_scope() {
        let mut st = SymbolTable::new();
        st.define("x", "int", Kind::Field).unwrap();
        st.define("y", "int", Kind::Field).unwrap();

        assert_eq!(
            st.lookup("x"),
            Some(&Symbol {
                type_name: "int".to_owned(),
                kind: Kind::Field,
                index: 0
            })
        );
        assert_eq!(st.index_of("y"), Some(1));
        assert_eq!(st.var_count(Kind::Field), 2);
        assert_eq!(st.var_count(Kind::Static), 0);
    }

    #[test]
    fn test_independent_counters() {
        let mut st = SymbolTable::new();
        assert_eq!(st.define("count", "int", Kind::Static), Ok(0));
        assert_eq!(st.define("name", "String", Kind::Field), Ok(0));
        assert_eq!(st.define("other", "int", Kind::Static), Ok(1));
        assert_eq!(st.define("a", "int", Kind::Argument), Ok(0));
        assert_eq!(st.define("i", "int", Kind::Local), Ok(0));
        assert_eq!(st.define("b", "boolean", Kind::Argument), Ok(1));

        assert_eq!(st.var_count(Kind::Static), 2);
        assert_eq!(st.var_count(Kind::Argument), 2);
        assert_eq!(st.var_count(Kind::Local), 1);
    }

    #[test]
    fn test_subroutine_shadows_class() {
        let mut st = SymbolTable::new();
        st.define("x", "int", Kind::Field).unwrap();
        st.define("x", "Array", Kind::Local).unwrap();

        assert_eq!(st.kind_of("x"), Some(Kind::Local));
        assert_eq!(st.type_of("x"), Some("Array"));

        st.start_subroutine();
        assert_eq!(st.kind_of("x"), Some(Kind::Field));
        assert_eq!(st.type_of("x"), Some("int"));
    }

    #[test]
    fn test_start_subroutine_resets() {
        let mut st = SymbolTable::new();
        st.define("f", "int", Kind::Field).unwrap();
        st.define("a", "int", Kind::Argument).unwrap();
        st.define("l", "int", Kind::Local).unwrap();

        st.start_subroutine();

        assert_eq!(st.lookup("a"), None);
        assert_eq!(st.lookup("l"), None);
        assert_eq!(st.var_count(Kind::Argument), 0);
        assert_eq!(st.var_count(Kind::Local), 0);
        assert_eq!(st.var_count(Kind::Field), 1);
        assert_eq!(st.define("b", "int", Kind::Argument), Ok(0));
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut st = SymbolTable::new();
        st.define("x", "int", Kind::Field).unwrap();
        assert_eq!(
            st.define("x", "int", Kind::Static),
            Err(DuplicateSymbol("x".to_owned()))
        );

        st.define("a", "int", Kind::Argument).unwrap();
        assert_eq!(
            st.define("a", "char", Kind::Local),
            Err(DuplicateSymbol("a".to_owned()))
        );
        // A failed define does not consume an index.
        assert_eq!(st.var_count(Kind::Local), 0);
    }

    #[test]
    fn test_unknown_name() {
        let st = SymbolTable::new();
        assert_eq!(st.kind_of("z"), None);
        assert_eq!(st.type_of("z"), None);
        assert_eq!(st.index_of("z"), None);
    }

    proptest! {
        /// Arguments and locals get dense indices in declaration order.
        #[test]
        fn test_dense_indices(n_args in 0..20usize, n_locals in 0..20usize) {
            let mut st = SymbolTable::new();
            st.start_subroutine();
            for i in 0..n_args {
                st.define(&format!("a{}", i), "int", Kind::Argument).unwrap();
            }
            for i in 0..n_locals {
                st.define(&format!("l{}", i), "int", Kind::Local).unwrap();
            }

            prop_assert_eq!(st.var_count(Kind::Argument) as usize, n_args);
            prop_assert_eq!(st.var_count(Kind::Local) as usize, n_locals);
            for i in 0..n_args {
                prop_assert_eq!(st.index_of(&format!("a{}", i)), Some(i as u16));
            }
            for i in 0..n_locals {
                prop_assert_eq!(st.index_of(&format!("l{}", i)), Some(i as u16));
            }
        }
    }
}
