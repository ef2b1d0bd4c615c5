//! Identifier reconciliation between render artifacts and the host runtime.
//!
//! The template compiler names its hoisted constants `_hoisted_N` and refers to
//! runtime helpers through `_name` aliases. The host runtime reserves names with a
//! leading underscore, and the assembled module has no import statement, so both
//! kinds of identifiers are rewritten:
//!
//! | identifier            | constants block   | render function        |
//! |-----------------------|-------------------|------------------------|
//! | `_hoisted_3`          | `r_itm_3`         | `this.r_itm_3`         |
//! | `_reactive` (import)  | `Vue.reactive`    | `Vue.reactive`         |
//!
//! Helper rewriting is driven by the [`GlobalImportSet`] of the whole build pass,
//! which must be complete before any artifact is reconciled. An artifact's own import
//! list maps its local aliases to runtime names; any other `_name` whose `name` is in
//! the pass-wide set is rewritten as well.

use std::collections::{BTreeSet, HashMap};

use crate::artifact::RenderArtifact;

/// Prefix the template compiler gives hoisted constants.
pub const COMPILER_HOISTED_PREFIX: &str = "_hoisted_";

/// Default prefix for renamed hoisted constants.
pub const DEFAULT_HOISTED_PREFIX: &str = "r_itm_";

/// Default namespace exposing the runtime API.
pub const DEFAULT_NAMESPACE: &str = "Vue";

/// Runtime API names imported by any render artifact of a build pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalImportSet {
    names: BTreeSet<String>,
}

impl GlobalImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the imports of every artifact.
    pub fn from_artifacts<'a>(artifacts: impl IntoIterator<Item = &'a RenderArtifact>) -> Self {
        let mut set = Self::new();
        for artifact in artifacts {
            set.add_artifact(artifact);
        }
        set
    }

    pub fn add_artifact(&mut self, artifact: &RenderArtifact) {
        for name in artifact.imported_names() {
            self.insert(name);
        }
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_str())
    }
}

impl<S: Into<String>> FromIterator<S> for GlobalImportSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Render code with runtime-compatible identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledRender {
    /// Constant declarations, in source order
    pub constants: Vec<String>,

    /// Renamed constant names to expose from the component's setup
    pub exposed: Vec<String>,

    /// Render method
    pub render: String,
}

/// Where rewritten code runs.
#[derive(Debug, Clone, Copy)]
enum Scope {
    /// Inside `setup()`, where constants are locals
    Setup,
    /// Inside the render method, where constants are reached through the instance
    Instance,
}

/// Rewrites render artifact identifiers.
#[derive(Debug, Clone)]
pub struct Reconciler {
    namespace: String,
    hoisted_prefix: String,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_HOISTED_PREFIX)
    }
}

impl Reconciler {
    pub fn new(namespace: impl Into<String>, hoisted_prefix: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            hoisted_prefix: hoisted_prefix.into(),
        }
    }

    /// Runtime-safe name for a compiler constant (`_hoisted_3` -> `r_itm_3`).
    ///
    /// Other underscore-prefixed constants keep their name minus the underscore,
    /// behind the same prefix.
    pub fn constant_name(&self, name: &str) -> Option<String> {
        let rest = name
            .strip_prefix(COMPILER_HOISTED_PREFIX)
            .or_else(|| name.strip_prefix('_'))?;
        Some(format!("{}{}", self.hoisted_prefix, rest))
    }

    /// Rewrite an artifact against the pass-wide import set.
    pub fn reconcile(&self, artifact: &RenderArtifact, imports: &GlobalImportSet) -> ReconciledRender {
        let helpers: HashMap<&str, &str> = artifact
            .imports
            .iter()
            .filter(|spec| imports.contains(&spec.imported))
            .map(|spec| (spec.local.as_str(), spec.imported.as_str()))
            .collect();

        let mut renamed: HashMap<&str, String> = HashMap::new();
        let mut exposed = Vec::new();

        for name in artifact.constants.iter().filter_map(|d| d.name.as_deref()) {
            let public = self.constant_name(name).unwrap_or_else(|| name.to_string());
            if !exposed.contains(&public) {
                exposed.push(public.clone());
            }
            renamed.insert(name, public);
        }

        let constants = artifact
            .constants
            .iter()
            .map(|decl| {
                decl.code
                    .render(|ident| self.substitute(ident, &renamed, &helpers, imports, Scope::Setup))
            })
            .collect();

        let render = artifact
            .render
            .render(|ident| self.substitute(ident, &renamed, &helpers, imports, Scope::Instance));

        ReconciledRender {
            constants,
            exposed,
            render,
        }
    }

    fn substitute(
        &self,
        ident: &str,
        renamed: &HashMap<&str, String>,
        helpers: &HashMap<&str, &str>,
        imports: &GlobalImportSet,
        scope: Scope,
    ) -> Option<String> {
        let constant = match renamed.get(ident) {
            Some(name) => Some(name.clone()),
            None if ident.starts_with(COMPILER_HOISTED_PREFIX) => self.constant_name(ident),
            None => None,
        };

        if let Some(name) = constant {
            return Some(match scope {
                Scope::Setup => name,
                Scope::Instance => format!("this.{name}"),
            });
        }

        let api = match helpers.get(ident) {
            Some(api) => *api,
            None => ident.strip_prefix('_').filter(|api| imports.contains(api))?,
        };
        Some(format!("{}.{}", self.namespace, api))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ARTIFACT: &str = r#"import { reactive as _reactive, computed as _computed } from "vue"

const _hoisted_1 = { class: "total" }
const _hoisted_3 = _reactive({ count: 0 })

export function render(_ctx, _cache) {
  return _computed(() => [_hoisted_1, _hoisted_3, _ctx._reactive, _reactive(_ctx.items)])
}"#;

    fn reconcile(imports: &[&str]) -> ReconciledRender {
        let artifact = RenderArtifact::parse(ARTIFACT).unwrap();
        let imports: GlobalImportSet = imports.iter().copied().collect();
        Reconciler::default().reconcile(&artifact, &imports)
    }

    #[test]
    fn rewrites_constants_block() {
        let result = reconcile(&["reactive", "computed"]);

        assert_eq!(
            result.constants,
            vec![
                "const r_itm_1 = { class: \"total\" }".to_string(),
                "const r_itm_3 = Vue.reactive({ count: 0 })".to_string(),
            ]
        );
        assert_eq!(result.exposed, vec!["r_itm_1", "r_itm_3"]);
    }

    #[test]
    fn rewrites_render_function_relative_to_instance() {
        let result = reconcile(&["reactive", "computed"]);

        assert_eq!(
            result.render,
            "render(_ctx, _cache) {\n  return Vue.computed(() => [this.r_itm_1, this.r_itm_3, _ctx._reactive, Vue.reactive(_ctx.items)])\n}"
        );
    }

    #[test]
    fn names_outside_the_import_set_are_kept() {
        let result = reconcile(&["reactive"]);

        assert!(result.render.contains("_computed(() =>"));
        assert!(result.render.contains("Vue.reactive(_ctx.items)"));
        assert!(!result.render.contains("Vue.computed"));
    }

    #[test]
    fn import_set_spans_artifacts() {
        let a = RenderArtifact::parse(
            "import { openBlock as _openBlock } from \"vue\"\nexport function render() {}",
        )
        .unwrap();
        let b = RenderArtifact::parse(
            "import { toDisplayString as _toDisplayString, openBlock as _openBlock } from \"vue\"\nexport function render() {}",
        )
        .unwrap();

        let set = GlobalImportSet::from_artifacts([&a, &b]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["openBlock", "toDisplayString"]);
    }

    #[test]
    fn helpers_follow_their_import_alias() {
        let artifact = RenderArtifact::parse(
            "import { toDisplayString as _tds, openBlock as _ob } from \"vue\"\nexport function render(_ctx) {\n  return (_ob(), _tds(_ctx.msg), _toDisplayString)\n}",
        )
        .unwrap();
        let imports = GlobalImportSet::from_artifacts([&artifact]);

        let result = Reconciler::default().reconcile(&artifact, &imports);

        assert_eq!(
            result.render,
            "render(_ctx) {\n  return (Vue.openBlock(), Vue.toDisplayString(_ctx.msg), Vue.toDisplayString)\n}"
        );
    }

    #[test]
    fn aliases_outside_the_import_set_are_kept() {
        let artifact = RenderArtifact::parse(
            "import { toDisplayString as _tds } from \"vue\"\nexport function render() {\n  return _tds(1)\n}",
        )
        .unwrap();

        let result = Reconciler::default().reconcile(&artifact, &GlobalImportSet::new());

        assert_eq!(result.render, "render() {\n  return _tds(1)\n}");
    }

    #[test]
    fn uses_configured_prefix_and_namespace() {
        let artifact = RenderArtifact::parse(ARTIFACT).unwrap();
        let imports: GlobalImportSet = ["reactive"].into_iter().collect();

        let result = Reconciler::new("Runtime", "hoisted$").reconcile(&artifact, &imports);

        assert_eq!(result.constants[1], "const hoisted$3 = Runtime.reactive({ count: 0 })");
        assert!(result.render.contains("this.hoisted$1"));
    }

    #[test]
    fn renames_other_compiler_constants() {
        let artifact = RenderArtifact::parse(
            "import { pushScopeId as _pushScopeId, popScopeId as _popScopeId } from \"vue\"\n\nconst _withScopeId = n => (_pushScopeId(\"data-v-1\"),n=n(),_popScopeId(),n)\nconst _hoisted_1 = /*#__PURE__*/ _withScopeId(() => 1)\n\nexport function render(_ctx, _cache) {\n  return _withScopeId\n}",
        )
        .unwrap();
        let imports = GlobalImportSet::from_artifacts([&artifact]);

        let result = Reconciler::default().reconcile(&artifact, &imports);

        assert_eq!(result.exposed, vec!["r_itm_withScopeId", "r_itm_1"]);
        assert!(result.constants[0].starts_with("const r_itm_withScopeId = n => (Vue.pushScopeId("));
        assert!(result.constants[1].contains("r_itm_withScopeId(() => 1)"));
        assert!(result.render.contains("return this.r_itm_withScopeId"));
    }
}
