use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use indexmap::IndexMap;

use crate::value::Value;

pub type EnvironmentRef = Rc<RefCell<Environment>>;
pub type ProgramEnvironmentRef = Rc<RefCell<ProgramEnvironment>>;
pub type ModuleExports = IndexMap<String, Value>;

/// Program-wide state shared by every environment of a run: the directory
/// import paths resolve against, and the registry of evaluated modules.
/// Created once per run and threaded through the environments, never global.
pub struct ProgramEnvironment {
    run_directory: PathBuf,
    modules: IndexMap<PathBuf, ModuleExports>,
}

impl ProgramEnvironment {
    pub fn new(run_directory: PathBuf) -> ProgramEnvironmentRef {
        Rc::new(RefCell::new(Self {
            run_directory,
            modules: IndexMap::new(),
        }))
    }

    pub fn run_directory(&self) -> &Path {
        &self.run_directory
    }

    pub fn is_module_registered(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }

    /// Registers a module with an empty export table. Registration happens
    /// before the module is evaluated, so a cyclic import finds the entry
    /// and does not re-enter evaluation.
    pub fn register_module(&mut self, path: PathBuf) {
        self.modules.entry(path).or_default();
    }

    pub fn register_export(&mut self, path: &Path, name: String, value: Value) {
        self.modules
            .entry(path.to_path_buf())
            .or_default()
            .insert(name, value);
    }

    pub fn module_export(&self, path: &Path, name: &str) -> Option<Value> {
        self.modules.get(path)?.get(name).cloned()
    }
}

/// A lexically chained variable scope. `set` only ever writes the innermost
/// scope; lookup walks outward through the enclosing environments.
pub struct Environment {
    module_path: PathBuf,
    store: IndexMap<String, Value>,
    outer: Option<EnvironmentRef>,
    program: ProgramEnvironmentRef,
}

impl Environment {
    pub fn new(module_path: PathBuf, program: ProgramEnvironmentRef) -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            module_path,
            store: IndexMap::new(),
            outer: None,
            program,
        }))
    }

    /// Child scope sharing the outer environment's module path and program
    /// registry; used for function calls.
    pub fn enclosed(outer: &EnvironmentRef) -> EnvironmentRef {
        let (module_path, program) = {
            let outer = outer.borrow();
            (outer.module_path.clone(), Rc::clone(&outer.program))
        };
        Rc::new(RefCell::new(Self {
            module_path,
            store: IndexMap::new(),
            outer: Some(Rc::clone(outer)),
            program,
        }))
    }

    pub fn get(environment: &EnvironmentRef, name: &str) -> Option<Value> {
        if let Some(value) = environment.borrow().store.get(name) {
            return Some(value.clone());
        }
        let outer = environment.borrow().outer.clone();
        match outer {
            Some(outer) => Environment::get(&outer, name),
            None => None,
        }
    }

    pub fn set(&mut self, name: String, value: Value) {
        self.store.insert(name, value);
    }

    pub fn export(&self, name: String, value: Value) {
        self.program
            .borrow_mut()
            .register_export(&self.module_path, name, value);
    }

    pub fn module_export(&self, path: &Path, name: &str) -> Option<Value> {
        self.program.borrow().module_export(path, name)
    }

    pub fn run_directory(&self) -> PathBuf {
        self.program.borrow().run_directory().to_path_buf()
    }

    pub fn program(&self) -> ProgramEnvironmentRef {
        Rc::clone(&self.program)
    }
}
