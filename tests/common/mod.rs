//! Shared test host.
//!
//! `FakeHost` keeps loaded modules in memory but reads their source from real
//! files under a temporary directory, so modification times and static
//! analysis behave as they would for a live interpreter. "Executing" a module
//! records its `def` functions, simple `name = "value"` assignments and
//! `__all__`. Every execution bumps the module's `_tag`, which tells tests
//! whether a module actually reloaded.
//!
//! The generated hierarchy:
//!
//! ```text
//! mod1.py .. mod5.py     mod3 imports pkg.subpkg.ssmod2; mod4 has __all__
//! mod6.py                imports A, pkg.smod1, altpkg.amod1
//! pkg/smod1.py .. smod4.py
//! pkg/subpkg/ssmod1.py, ssmod2.py   ssmod2 imports relatively
//! altpkg/amod1.py
//! A.py .. G.py           A->C, B->C,D,G, C->E,F, D->F, E->A
//! ```

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use liveimport::imports::{dedent, parse_cell_imports, parse_imports};
use liveimport::{
    Bindings, Host, HostError, ModuleOrigin, NamespaceId, ReloadEvent, Reloader, Workspace,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Function defined by a module, as `module.name#tag`
    Func(String),
    Str(String),
    Int(i64),
    Module(String),
}

#[derive(Debug, Clone, Default)]
struct LoadedModule {
    file: Option<PathBuf>,
    parent: String,
    attrs: BTreeMap<String, Value>,
    exports: Option<Vec<String>>,
}

pub struct FakeHost {
    root: PathBuf,
    modules: HashMap<String, LoadedModule>,
    namespaces: HashMap<NamespaceId, BTreeMap<String, Value>>,
    /// Every successful reload, in order
    pub reloads: Vec<String>,
}

impl FakeHost {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            modules: HashMap::new(),
            namespaces: HashMap::new(),
            reloads: Vec::new(),
        }
    }

    /// Source file a module would load from.
    pub fn source_file(&self, name: &str) -> PathBuf {
        let relative = name.replace('.', "/");
        let package_init = self.root.join(&relative).join("__init__.py");
        if package_init.exists() {
            package_init
        } else {
            self.root.join(format!("{}.py", relative))
        }
    }

    /// Load a module and its parent packages, like a first import.
    pub fn load(&mut self, name: &str) -> Result<(), String> {
        if self.modules.contains_key(name) {
            return Ok(());
        }

        let parent_package = name.rsplit_once('.').map(|(parent, _)| parent.to_string());
        if let Some(parent) = &parent_package {
            self.load(parent)?;
        }

        let file = self.source_file(name);
        let source = fs::read_to_string(&file).map_err(|_| format!("No module named {}", name))?;
        let is_package = file.file_name().is_some_and(|f| f == "__init__.py");
        let parent = if is_package {
            name.to_string()
        } else {
            parent_package.clone().unwrap_or_default()
        };

        let mut module = LoadedModule {
            file: Some(file),
            parent: parent.clone(),
            ..LoadedModule::default()
        };
        execute(name, &source, &mut module)?;
        self.modules.insert(name.to_string(), module);

        if let Some((parent, last)) = name.rsplit_once('.') {
            if let Some(package) = self.modules.get_mut(parent) {
                package
                    .attrs
                    .insert(last.to_string(), Value::Module(name.to_string()));
            }
        }

        // Load what the module imports. Unknown modules (re, math) are
        // skipped; cycles end because the module is already registered above.
        let directives = parse_cell_imports(&source, Some(parent.as_str())).unwrap_or_default();
        for directive in directives {
            let _ = self.load(&directive.module);
            if let Bindings::Names(pairs) = &directive.bindings {
                for (source_name, _) in pairs {
                    if self.attr(&directive.module, source_name).is_none() {
                        let _ = self.load(&format!("{}.{}", directive.module, source_name));
                    }
                }
            }
        }
        Ok(())
    }

    /// A loaded module with no source file, like a builtin.
    pub fn add_detached_module(&mut self, name: &str, attrs: &[(&str, Value)]) {
        let module = LoadedModule {
            file: None,
            parent: String::new(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            exports: None,
        };
        self.modules.insert(name.to_string(), module);
    }

    /// A loaded module claiming a source file that need not exist.
    pub fn add_module_with_file(&mut self, name: &str, file: &Path) {
        let module = LoadedModule {
            file: Some(file.to_path_buf()),
            ..LoadedModule::default()
        };
        self.modules.insert(name.to_string(), module);
    }

    /// Execute import statements into `namespace`, loading modules as needed.
    pub fn import(&mut self, namespace: NamespaceId, statements: &str) {
        self.import_in(namespace, statements, None);
    }

    pub fn import_in(&mut self, namespace: NamespaceId, statements: &str, package: Option<&str>) {
        let directives = parse_imports(&dedent(statements), package).expect("valid import statements");
        for directive in directives {
            let module = directive.module.clone();
            self.load(&module).expect("module loads");
            match &directive.bindings {
                Bindings::WholeModule => {
                    let (local, target) = match &directive.alias {
                        Some(alias) => (alias.clone(), module.clone()),
                        None => {
                            let top = module.split('.').next().unwrap_or(&module).to_string();
                            (top.clone(), top)
                        }
                    };
                    self.set_name(namespace, &local, Value::Module(target));
                }
                Bindings::Wildcard => {
                    for name in self.public_names(&module) {
                        let value = self.get_attribute(&module, &name).expect("public name defined");
                        self.set_name(namespace, &name, value);
                    }
                }
                Bindings::Names(pairs) => {
                    for (source, local) in pairs {
                        if self.get_attribute(&module, source).is_none() {
                            let _ = self.load(&format!("{}.{}", module, source));
                        }
                        let value = self
                            .get_attribute(&module, source)
                            .unwrap_or_else(|| panic!("cannot import {} from {}", source, module));
                        self.set_name(namespace, local, value);
                    }
                }
            }
        }
    }

    pub fn set_name(&mut self, namespace: NamespaceId, name: &str, value: Value) {
        self.namespaces
            .entry(namespace)
            .or_default()
            .insert(name.to_string(), value);
    }

    pub fn name(&self, namespace: NamespaceId, name: &str) -> Option<Value> {
        self.namespaces.get(&namespace)?.get(name).cloned()
    }

    pub fn attr(&self, module: &str, name: &str) -> Option<Value> {
        self.modules.get(module)?.attrs.get(name).cloned()
    }

    pub fn delete_attr(&mut self, module: &str, name: &str) {
        if let Some(module) = self.modules.get_mut(module) {
            module.attrs.remove(name);
        }
    }

    /// Number of times the module executed.
    pub fn tag(&self, module: &str) -> i64 {
        match self.attr(module, "_tag") {
            Some(Value::Int(tag)) => tag,
            _ => 0,
        }
    }

    pub fn take_reloads(&mut self) -> Vec<String> {
        std::mem::take(&mut self.reloads)
    }
}

/// Run module source: functions, string assignments, `__all__`. Names from a
/// previous execution survive, as with an in-place reload.
fn execute(name: &str, source: &str, module: &mut LoadedModule) -> Result<(), String> {
    if source.contains("not valid python") {
        return Err(format!("invalid syntax ({})", name));
    }
    if source.contains("raise RuntimeError") {
        return Err(format!("RuntimeError raised while executing {}", name));
    }

    let tag = match module.attrs.get("_tag") {
        Some(Value::Int(tag)) => tag + 1,
        _ => 1,
    };

    let mut attrs = module.attrs.clone();
    let mut exports = module.exports.clone();

    for line in source.lines() {
        if let Some(rest) = line.strip_prefix("def ") {
            let function = rest.split('(').next().unwrap_or(rest).trim();
            attrs.insert(
                function.to_string(),
                Value::Func(format!("{}.{}#{}", name, function, tag)),
            );
        } else if let Some(rest) = line.strip_prefix("__all__ = [") {
            let names = rest
                .trim_end_matches(']')
                .split(',')
                .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                .filter(|s| !s.is_empty())
                .collect();
            exports = Some(names);
        } else if let Some((lhs, rhs)) = line.split_once(" = ") {
            let lhs = lhs.trim();
            if !lhs.is_empty() && lhs.chars().all(|c| c.is_alphanumeric() || c == '_') {
                let value = rhs.trim().trim_matches(|c| c == '"' || c == '\'');
                attrs.insert(lhs.to_string(), Value::Str(value.to_string()));
            }
        }
    }

    attrs.insert("_tag".to_string(), Value::Int(tag));
    module.attrs = attrs;
    module.exports = exports;
    Ok(())
}

impl Host for FakeHost {
    type Module = String;
    type Value = Value;

    fn loaded_module(&self, name: &str) -> Option<String> {
        self.modules.contains_key(name).then(|| name.to_string())
    }

    fn module_name(&self, module: &String) -> String {
        module.clone()
    }

    fn module_origin(&self, module: &String) -> ModuleOrigin {
        match self.modules.get(module) {
            Some(loaded) => ModuleOrigin {
                file: loaded.file.clone(),
                parent: loaded.parent.clone(),
            },
            None => ModuleOrigin::default(),
        }
    }

    fn get_attribute(&self, module: &String, name: &str) -> Option<Value> {
        self.attr(module, name)
    }

    fn attribute_names(&self, module: &String) -> Vec<String> {
        self.modules
            .get(module)
            .map(|m| m.attrs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn declared_exports(&self, module: &String) -> Option<Vec<String>> {
        self.modules.get(module)?.exports.clone()
    }

    fn as_module(&self, value: &Value) -> Option<String> {
        match value {
            Value::Module(name) => Some(name.clone()),
            _ => None,
        }
    }

    fn module_value(&self, module: &String) -> Value {
        Value::Module(module.clone())
    }

    fn reload_module(&mut self, module: &String) -> Result<String, HostError> {
        let loaded = self
            .modules
            .get_mut(module)
            .ok_or_else(|| format!("module {} not loaded", module))?;
        let file = loaded
            .file
            .clone()
            .ok_or_else(|| format!("module {} has no source", module))?;
        let source = fs::read_to_string(&file)?;
        execute(module, &source, loaded)?;
        self.reloads.push(module.clone());
        Ok(module.clone())
    }

    fn namespace_contains(&self, namespace: NamespaceId, name: &str) -> bool {
        self.namespaces
            .get(&namespace)
            .is_some_and(|names| names.contains_key(name))
    }

    fn namespace_set(&mut self, namespace: NamespaceId, name: &str, value: Value) {
        self.set_name(namespace, name, value);
    }
}

/// Source text of a generated module.
pub fn module_source(name: &str, imports: &[&str], all: Option<&[&str]>, postscript: &str) -> String {
    let base = name.rsplit('.').next().unwrap_or(name);
    let mut lines: Vec<String> = vec!["import re".to_string(), "from math import nan".to_string()];
    lines.extend(imports.iter().map(|s| s.to_string()));
    if let Some(all) = all {
        let quoted: Vec<String> = all.iter().map(|s| format!("\"{}\"", s)).collect();
        lines.push(format!("__all__ = [{}]", quoted.join(", ")));
    }
    for n in 1..=3 {
        lines.push(format!("def {}_public{}(): pass", base, n));
    }
    for n in 1..=3 {
        lines.push(format!("def _{}_private{}(): pass", base, n));
    }
    if !postscript.is_empty() {
        lines.push(dedent(postscript).trim().to_string());
    }
    lines.push(String::new());
    lines.join("\n")
}

/// A generated module tree, a host, a reloader and one namespace.
pub struct Fixture {
    pub dir: TempDir,
    pub host: FakeHost,
    pub reloader: Reloader<FakeHost>,
    pub ns: NamespaceId,
    clock: SystemTime,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().to_path_buf();

        for package in ["pkg", "pkg/subpkg", "altpkg"] {
            fs::create_dir_all(root.join(package)).unwrap();
            fs::write(root.join(package).join("__init__.py"), "").unwrap();
        }

        let host = FakeHost::new(&root);
        let reloader = Reloader::new(Workspace::new([&root]).unwrap());
        let mut fixture = Self {
            dir,
            host,
            reloader,
            ns: NamespaceId::new(),
            // Touched files get times an hour back and later, never the
            // creation time.
            clock: SystemTime::now() - Duration::from_secs(3600),
        };

        let plain: &[(&str, &[&str])] = &[
            ("mod1", &[]),
            ("mod2", &[]),
            ("mod3", &["import pkg.subpkg.ssmod2"]),
            ("mod5", &[]),
            ("mod6", &["import A, pkg.smod1, altpkg.amod1"]),
            ("pkg.smod1", &[]),
            ("pkg.smod2", &[]),
            ("pkg.smod3", &[]),
            ("pkg.smod4", &[]),
            ("altpkg.amod1", &[]),
            ("pkg.subpkg.ssmod1", &[]),
            (
                "pkg.subpkg.ssmod2",
                &["from . ssmod1 import ssmod1_public1", "from .. smod1 import smod1_public1"],
            ),
            ("A", &["import C"]),
            ("B", &["import C; from D import nan; import G"]),
            ("C", &["import E, F"]),
            ("D", &["from F import *"]),
            ("E", &["import A as littlea"]),
            ("F", &[]),
            ("G", &[]),
        ];
        for (name, imports) in plain {
            fixture.write_source(name, &module_source(name, imports, None, ""));
        }
        fixture.write_source(
            "mod4",
            &module_source("mod4", &[], Some(&["mod4_public1", "mod4_public2"]), ""),
        );

        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, module: &str) -> PathBuf {
        self.host.source_file(module)
    }

    fn write_source(&mut self, module: &str, source: &str) {
        let file = self.file(module);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&file, source).unwrap();
    }

    /// Replace a module's source and give it a fresh modification time.
    pub fn rewrite(&mut self, module: &str, source: &str) {
        self.write_source(module, source);
        self.touch(module);
    }

    /// Give a module's source a modification time never used before.
    pub fn touch(&mut self, module: &str) {
        self.clock += Duration::from_secs(10);
        let time = self.clock;
        self.set_mtime(module, time);
    }

    pub fn set_mtime(&self, module: &str, time: SystemTime) {
        let file = fs::File::options().write(true).open(self.file(module)).unwrap();
        file.set_modified(time).unwrap();
    }

    pub fn mtime(&self, module: &str) -> SystemTime {
        fs::metadata(self.file(module)).unwrap().modified().unwrap()
    }

    /// Remove a module's source, returning its content for [`Fixture::restore`].
    pub fn delete(&self, module: &str) -> String {
        let file = self.file(module);
        let source = fs::read_to_string(&file).unwrap();
        fs::remove_file(file).unwrap();
        source
    }

    pub fn restore(&mut self, module: &str, source: &str) {
        self.rewrite(module, source);
    }

    /// Execute then register import statements in the fixture namespace.
    pub fn import(&mut self, statements: &str) {
        self.host.import(self.ns, statements);
        self.register(statements).unwrap();
    }

    pub fn register(&mut self, statements: &str) -> liveimport::Result<()> {
        self.reloader
            .register(&self.host, self.ns, statements, None, false)
    }

    pub fn register_in(&mut self, ns: NamespaceId, statements: &str, clear: bool) -> liveimport::Result<()> {
        self.reloader.register(&self.host, ns, statements, None, clear)
    }

    pub fn is_registered(&self, module: &str, name: Option<&str>, alias: Option<&str>) -> bool {
        self.reloader.is_registered(self.ns, module, name, alias)
    }

    /// Sync, returning the events observed along with the outcome.
    pub fn sync_events(&mut self) -> (Vec<ReloadEvent>, liveimport::Result<()>) {
        let mut events = Vec::new();
        let result = self
            .reloader
            .sync_with(&mut self.host, |event| events.push(event.clone()));
        (events, result)
    }

    /// Sync successfully, returning the reloaded modules in order.
    pub fn reloaded(&mut self) -> Vec<String> {
        let (events, result) = self.sync_events();
        result.expect("sync succeeds");
        events.into_iter().map(|e| e.module).collect()
    }
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
