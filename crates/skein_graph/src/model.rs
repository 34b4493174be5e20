//! Projects, targets, dependency edges, and the immutable graph that holds them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Identifies a target by the path of its project and its name.
///
/// Ordering is by project path, then target name, which gives every
/// collection of refs a stable iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    /// Path of the owning project.
    pub project: PathBuf,
    /// Target name, unique within the project.
    pub name: String,
}

impl TargetRef {
    /// Creates a new target reference.
    pub fn new(project: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project.display(), self.name)
    }
}

/// The kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    /// An application bundle.
    App,
    /// A static library.
    StaticLibrary,
    /// A dynamic library.
    DynamicLibrary,
    /// A dynamic framework.
    Framework,
    /// A static framework.
    StaticFramework,
    /// A resource bundle.
    Bundle,
    /// A command line executable.
    CommandLineTool,
    /// An app extension.
    AppExtension,
    /// A compiler macro plugin.
    Macro,
    /// A unit test bundle.
    UnitTests,
    /// A UI test bundle.
    UiTests,
}

impl Product {
    /// Returns `true` for unit and UI test bundles.
    pub fn is_test(self) -> bool {
        matches!(self, Product::UnitTests | Product::UiTests)
    }

    /// Returns `true` for products other targets consume through an import.
    ///
    /// Apps, extensions, bundles, tools, macros, and test bundles are linked
    /// or embedded without ever being named in source.
    pub fn is_importable(self) -> bool {
        matches!(
            self,
            Product::StaticLibrary | Product::DynamicLibrary | Product::Framework | Product::StaticFramework
        )
    }

    /// Returns the stable identifier used in serialized graphs and hashes.
    pub fn as_str(self) -> &'static str {
        match self {
            Product::App => "app",
            Product::StaticLibrary => "static_library",
            Product::DynamicLibrary => "dynamic_library",
            Product::Framework => "framework",
            Product::StaticFramework => "static_framework",
            Product::Bundle => "bundle",
            Product::CommandLineTool => "command_line_tool",
            Product::AppExtension => "app_extension",
            Product::Macro => "macro",
            Product::UnitTests => "unit_tests",
            Product::UiTests => "ui_tests",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared dependency edge of a target.
///
/// Only [`Dependency::Target`] and [`Dependency::Project`] resolve to targets
/// in the graph. The remaining variants are terminal leaves that contribute a
/// locator string and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dependency {
    /// A target in the same project.
    Target {
        /// Name of the target.
        name: String,
    },
    /// A target in another project.
    Project {
        /// Path of the other project.
        path: PathBuf,
        /// Name of the target in that project.
        target: String,
    },
    /// A product of an external package.
    Package {
        /// Product name.
        product: String,
    },
    /// A prebuilt binary or framework.
    Binary {
        /// Location of the binary.
        locator: String,
    },
    /// A platform SDK library or framework.
    Sdk {
        /// SDK name.
        name: String,
    },
    /// The host application of a test bundle.
    TestHost {
        /// The hosting target.
        target: TargetRef,
    },
}

impl Dependency {
    /// Same-project target edge.
    pub fn target(name: impl Into<String>) -> Self {
        Dependency::Target { name: name.into() }
    }

    /// Cross-project target edge.
    pub fn project(path: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Dependency::Project {
            path: path.into(),
            target: target.into(),
        }
    }

    /// Locator string for terminal leaves, `None` for graph edges.
    pub fn leaf_locator(&self) -> Option<String> {
        match self {
            Dependency::Target { .. } | Dependency::Project { .. } => None,
            Dependency::Package { product } => Some(format!("package:{product}")),
            Dependency::Binary { locator } => Some(format!("binary:{locator}")),
            Dependency::Sdk { name } => Some(format!("sdk:{name}")),
            Dependency::TestHost { target } => Some(format!("host:{target}")),
        }
    }
}

/// What a dependency edge resolves to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resolved {
    /// A target in the graph.
    Target(TargetRef),
    /// A terminal leaf, identified by its locator.
    Leaf(String),
}

/// A build setting value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// A scalar value.
    String(String),
    /// An ordered list of values.
    Array(Vec<String>),
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<Vec<String>> for SettingValue {
    fn from(values: Vec<String>) -> Self {
        SettingValue::Array(values)
    }
}

/// A buildable unit within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Name, unique within the project.
    pub name: String,
    /// Kind of product built.
    pub product: Product,
    /// Module name other targets import, when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// Compiled source files.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Header-like files; scanned for imports and hashed as content.
    #[serde(default)]
    pub headers: Vec<PathBuf>,
    /// Declared dependency edges. Order carries no meaning.
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Build settings.
    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,
}

impl Target {
    /// Creates a target with no files, dependencies, or settings.
    pub fn new(name: impl Into<String>, product: Product) -> Self {
        Self {
            name: name.into(),
            product,
            product_name: None,
            sources: Vec::new(),
            headers: Vec::new(),
            dependencies: Vec::new(),
            settings: BTreeMap::new(),
        }
    }

    /// Sets the module name, for targets whose module is not named after
    /// the target.
    pub fn with_product_name(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = Some(product_name.into());
        self
    }

    /// The name other targets use to import this one.
    pub fn module_name(&self) -> &str {
        self.product_name.as_deref().unwrap_or(&self.name)
    }

    /// Appends source files.
    pub fn with_sources<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Appends header files.
    pub fn with_headers<I, P>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.headers.extend(headers.into_iter().map(Into::into));
        self
    }

    /// Adds a dependency edge.
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Sets a build setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Sources followed by headers.
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.sources.iter().chain(self.headers.iter())
    }
}

/// A named plan selecting a subset of a scheme's test targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlan {
    /// Plan name.
    pub name: String,
    /// Test targets in declaration order.
    #[serde(default)]
    pub targets: Vec<TargetRef>,
}

/// The test configuration of a scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAction {
    /// Test targets in declaration order.
    #[serde(default)]
    pub targets: Vec<TargetRef>,
    /// Named plans.
    #[serde(default)]
    pub test_plans: Vec<TestPlan>,
}

/// A named run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    /// Scheme name.
    pub name: String,
    /// Test action, if the scheme can run tests.
    #[serde(default)]
    pub test_action: Option<TestAction>,
}

impl Scheme {
    /// Creates a scheme without a test action.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            test_action: None,
        }
    }

    /// Sets the test action.
    pub fn with_test_action(mut self, action: TestAction) -> Self {
        self.test_action = Some(action);
        self
    }
}

/// A project: a path-identified container of targets and schemes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Unique path.
    pub path: PathBuf,
    /// Display name.
    pub name: String,
    /// Targets keyed by name.
    pub targets: BTreeMap<String, Target>,
    /// Schemes declared by this project.
    pub schemes: Vec<Scheme>,
}

impl Project {
    /// Creates an empty project.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            targets: BTreeMap::new(),
            schemes: Vec::new(),
        }
    }

    /// Adds a target, replacing one of the same name.
    pub fn with_target(mut self, target: Target) -> Self {
        self.targets.insert(target.name.clone(), target);
        self
    }

    /// Adds a scheme.
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.schemes.push(scheme);
        self
    }

    /// Adds a target, rejecting duplicate names.
    pub fn add_target(&mut self, target: Target) -> Result<(), GraphError> {
        if self.targets.contains_key(&target.name) {
            return Err(GraphError::DuplicateTarget {
                project: self.path.clone(),
                name: target.name,
            });
        }
        self.targets.insert(target.name.clone(), target);
        Ok(())
    }
}

/// The read-only project graph.
///
/// Built once per invocation and never mutated; safe to share across
/// threads by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    projects: BTreeMap<PathBuf, Project>,
    schemes: Vec<Scheme>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GraphDocument {
    projects: Vec<ProjectDocument>,
    #[serde(default)]
    schemes: Vec<Scheme>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectDocument {
    path: PathBuf,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    targets: Vec<Target>,
    #[serde(default)]
    schemes: Vec<Scheme>,
}

impl Graph {
    /// Builds a graph from projects and workspace-level schemes.
    ///
    /// Fails if two projects share a path. Edges are not checked here; call
    /// [`Graph::validate`] before hashing.
    pub fn new(
        projects: impl IntoIterator<Item = Project>,
        schemes: Vec<Scheme>,
    ) -> Result<Self, GraphError> {
        let mut map = BTreeMap::new();
        for project in projects {
            if map.contains_key(&project.path) {
                return Err(GraphError::DuplicateProject(project.path));
            }
            map.insert(project.path.clone(), project);
        }
        Ok(Self {
            projects: map,
            schemes,
        })
    }

    /// Decodes a graph from its JSON form.
    ///
    /// ```json
    /// { "projects": [ { "path": "App", "targets": [ { "name": "Core", "product": "framework" } ] } ] }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let doc: GraphDocument =
            serde_json::from_str(json).map_err(|e| GraphError::Decode(e.to_string()))?;
        let mut projects = Vec::with_capacity(doc.projects.len());
        for p in doc.projects {
            let name = p.name.unwrap_or_else(|| {
                p.path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.path.display().to_string())
            });
            let mut project = Project::new(p.path, name);
            for target in p.targets {
                project.add_target(target)?;
            }
            project.schemes = p.schemes;
            projects.push(project);
        }
        Self::new(projects, doc.schemes)
    }

    /// Iterates projects in path order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// Looks up a project by path.
    pub fn project(&self, path: &Path) -> Option<&Project> {
        self.projects.get(path)
    }

    /// Looks up a target.
    pub fn target(&self, target: &TargetRef) -> Option<&Target> {
        self.projects
            .get(&target.project)
            .and_then(|p| p.targets.get(&target.name))
    }

    /// Iterates every target with its ref, in ref order.
    pub fn targets(&self) -> impl Iterator<Item = (TargetRef, &Target)> {
        self.projects.values().flat_map(|p| {
            p.targets
                .values()
                .map(move |t| (TargetRef::new(p.path.clone(), t.name.clone()), t))
        })
    }

    /// Iterates workspace schemes, then project schemes in path order.
    pub fn schemes(&self) -> impl Iterator<Item = &Scheme> {
        self.schemes
            .iter()
            .chain(self.projects.values().flat_map(|p| p.schemes.iter()))
    }

    /// Finds the first scheme with the given name.
    pub fn scheme(&self, name: &str) -> Option<&Scheme> {
        self.schemes().find(|s| s.name == name)
    }

    /// Resolves one edge declared by `from`.
    ///
    /// This is the only place edges are interpreted; the traverser, the
    /// validator, and the hasher all go through it.
    pub fn resolve(&self, from: &TargetRef, dependency: &Dependency) -> Result<Resolved, GraphError> {
        let referent = match dependency {
            Dependency::Target { name } => TargetRef::new(from.project.clone(), name.clone()),
            Dependency::Project { path, target } => {
                if !self.projects.contains_key(path) {
                    return Err(GraphError::ProjectNotFound {
                        from: from.clone(),
                        path: path.clone(),
                    });
                }
                TargetRef::new(path.clone(), target.clone())
            }
            leaf => {
                return Ok(Resolved::Leaf(leaf.leaf_locator().unwrap_or_default()));
            }
        };
        if self.target(&referent).is_none() {
            return Err(GraphError::TargetNotFound {
                from: from.clone(),
                missing: referent,
            });
        }
        Ok(Resolved::Target(referent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        let app = Project::new("App", "App")
            .with_target(
                Target::new("App", Product::App)
                    .with_dependency(Dependency::target("Core"))
                    .with_dependency(Dependency::project("Kit", "Models"))
                    .with_dependency(Dependency::Sdk {
                        name: "UIKit.framework".to_string(),
                    }),
            )
            .with_target(Target::new("Core", Product::Framework));
        let kit = Project::new("Kit", "Kit").with_target(Target::new("Models", Product::StaticLibrary));
        Graph::new([app, kit], Vec::new()).unwrap()
    }

    #[test]
    fn target_ref_display_and_order() {
        let a = TargetRef::new("App", "Z");
        let b = TargetRef::new("Kit", "A");
        assert_eq!(a.to_string(), "App:Z");
        assert!(a < b);
    }

    #[test]
    fn test_products() {
        assert!(Product::UnitTests.is_test());
        assert!(Product::UiTests.is_test());
        assert!(!Product::Framework.is_test());
    }

    #[test]
    fn leaf_locators() {
        let host = Dependency::TestHost {
            target: TargetRef::new("App", "App"),
        };
        assert_eq!(host.leaf_locator().as_deref(), Some("host:App:App"));
        let pkg = Dependency::Package {
            product: "Alamofire".to_string(),
        };
        assert_eq!(pkg.leaf_locator().as_deref(), Some("package:Alamofire"));
        assert_eq!(Dependency::target("Core").leaf_locator(), None);
    }

    #[test]
    fn resolve_edges() {
        let graph = sample();
        let from = TargetRef::new("App", "App");
        assert_eq!(
            graph.resolve(&from, &Dependency::target("Core")).unwrap(),
            Resolved::Target(TargetRef::new("App", "Core"))
        );
        assert_eq!(
            graph.resolve(&from, &Dependency::project("Kit", "Models")).unwrap(),
            Resolved::Target(TargetRef::new("Kit", "Models"))
        );
        assert_eq!(
            graph
                .resolve(&from, &Dependency::Binary { locator: "Vendor.xcframework".into() })
                .unwrap(),
            Resolved::Leaf("binary:Vendor.xcframework".to_string())
        );
    }

    #[test]
    fn resolve_missing_target() {
        let graph = sample();
        let from = TargetRef::new("App", "App");
        let err = graph.resolve(&from, &Dependency::target("Gone")).unwrap_err();
        assert_eq!(
            err,
            GraphError::TargetNotFound {
                from,
                missing: TargetRef::new("App", "Gone"),
            }
        );
    }

    #[test]
    fn resolve_missing_project() {
        let graph = sample();
        let from = TargetRef::new("App", "App");
        let err = graph.resolve(&from, &Dependency::project("Nowhere", "X")).unwrap_err();
        assert!(matches!(err, GraphError::ProjectNotFound { .. }));
    }

    #[test]
    fn duplicate_project_rejected() {
        let err = Graph::new(
            [Project::new("App", "App"), Project::new("App", "Again")],
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, GraphError::DuplicateProject(PathBuf::from("App")));
    }

    #[test]
    fn targets_iterate_in_ref_order() {
        let graph = sample();
        let refs: Vec<String> = graph.targets().map(|(r, _)| r.to_string()).collect();
        assert_eq!(refs, vec!["App:App", "App:Core", "Kit:Models"]);
    }

    #[test]
    fn from_json_decodes_graph() {
        let json = r#"{
            "projects": [
                {
                    "path": "/work/App",
                    "targets": [
                        {
                            "name": "Core",
                            "product": "framework",
                            "sources": ["Sources/Core/Core.swift"],
                            "dependencies": [
                                { "kind": "package", "product": "Logging" },
                                { "kind": "target", "name": "Models" }
                            ],
                            "settings": { "SWIFT_VERSION": "5.9", "FLAGS": ["-a", "-b"] }
                        },
                        { "name": "Models", "product": "static_library" },
                        {
                            "name": "CoreTests",
                            "product": "unit_tests",
                            "dependencies": [
                                { "kind": "target", "name": "Core" },
                                { "kind": "test_host", "target": { "project": "/work/App", "name": "Core" } }
                            ]
                        }
                    ],
                    "schemes": [
                        { "name": "App", "test_action": { "targets": [ { "project": "/work/App", "name": "CoreTests" } ] } }
                    ]
                }
            ]
        }"#;
        let graph = Graph::from_json(json).unwrap();
        let project = graph.project(Path::new("/work/App")).unwrap();
        assert_eq!(project.name, "App");
        let core = graph.target(&TargetRef::new("/work/App", "Core")).unwrap();
        assert_eq!(core.product, Product::Framework);
        assert_eq!(
            core.settings.get("FLAGS"),
            Some(&SettingValue::Array(vec!["-a".into(), "-b".into()]))
        );
        assert_eq!(
            core.settings.get("SWIFT_VERSION"),
            Some(&SettingValue::String("5.9".into()))
        );
        assert!(graph.scheme("App").is_some());
    }

    #[test]
    fn module_name_defaults_to_target_name() {
        let plain = Target::new("Core", Product::Framework);
        assert_eq!(plain.module_name(), "Core");
        let renamed = Target::new("App-iOS", Product::App).with_product_name("App");
        assert_eq!(renamed.module_name(), "App");

        let json = r#"{ "projects": [ { "path": "App", "targets": [
            { "name": "Kit-iOS", "product": "framework", "product_name": "Kit" }
        ] } ] }"#;
        let graph = Graph::from_json(json).unwrap();
        let kit = graph.target(&TargetRef::new("App", "Kit-iOS")).unwrap();
        assert_eq!(kit.module_name(), "Kit");
    }

    #[test]
    fn only_libraries_and_frameworks_are_importable() {
        assert!(Product::Framework.is_importable());
        assert!(Product::StaticLibrary.is_importable());
        assert!(!Product::App.is_importable());
        assert!(!Product::Bundle.is_importable());
        assert!(!Product::UnitTests.is_importable());
        assert!(!Product::Macro.is_importable());
    }

    #[test]
    fn from_json_rejects_duplicate_targets() {
        let json = r#"{ "projects": [ { "path": "App", "targets": [
            { "name": "Core", "product": "framework" },
            { "name": "Core", "product": "framework" }
        ] } ] }"#;
        let err = Graph::from_json(json).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateTarget { .. }));
    }

    #[test]
    fn from_json_reports_decode_errors() {
        let err = Graph::from_json("{ not json").unwrap_err();
        assert!(matches!(err, GraphError::Decode(_)));
    }
}
