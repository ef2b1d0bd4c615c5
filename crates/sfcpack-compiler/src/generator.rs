//! Component module generator.
//!
//! Assembles the final self-registering module of a component:
//!
//! 1. registration header named after the component,
//! 2. `setup()` declaring the render constants, merging the component's
//!    localization messages into the runtime store, and exposing the constants,
//! 3. the render method, or the raw template string in debug builds,
//! 4. the members of the component's script block.

use minijinja::{context, AutoEscape, Environment};
use serde::{Deserialize, Serialize};
use sfcpack_sfc::{LocalizationError, LocalizationTable};

use crate::reconcile::{ReconciledRender, Reconciler, DEFAULT_HOISTED_PREFIX, DEFAULT_NAMESPACE};

/// Names the assembled module expects from its host page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeNames {
    /// Global component registration function
    pub register: String,

    /// Namespace exposing the runtime API
    pub namespace: String,

    /// Composition function returning the translation helper `t`
    pub use_i18n: String,

    /// Localization runtime with a `mergeLocaleMessage(locale, messages)` operation
    pub i18n_global: String,

    /// Prefix for renamed hoisted constants
    pub hoisted_prefix: String,
}

impl Default for RuntimeNames {
    fn default() -> Self {
        Self {
            register: "app.component".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            use_i18n: "VueI18n.useI18n".to_string(),
            i18n_global: "i18n.global".to_string(),
            hoisted_prefix: DEFAULT_HOISTED_PREFIX.to_string(),
        }
    }
}

impl RuntimeNames {
    /// Reconciler rewriting artifacts for these names.
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(&self.namespace, &self.hoisted_prefix)
    }
}

/// How the module renders.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderAttachment {
    /// Reconciled render function (release builds)
    Compiled(ReconciledRender),
    /// Raw template text compiled by the runtime (debug builds)
    Template(String),
}

/// Errors that can occur while assembling a module.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("Localization error: {0}")]
    Localization(#[from] LocalizationError),

    #[error("Failed to render module template: {0}")]
    Template(#[from] minijinja::Error),
}

/// Module assembler.
pub struct ModuleAssembler {
    env: Environment<'static>,
    runtime: RuntimeNames,
}

impl ModuleAssembler {
    pub fn new(runtime: RuntimeNames) -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);

        env.add_template_owned("component.js".to_string(), MODULE_TEMPLATE.to_string())
            .expect("Failed to add component module template");

        Self { env, runtime }
    }

    /// Assemble the module text of a component.
    pub fn assemble(
        &self,
        name: &str,
        render: &RenderAttachment,
        script_members: &str,
        localization: &LocalizationTable,
    ) -> Result<String, AssembleError> {
        let messages = indent_tail(&localization.to_json_pretty()?, 4);

        let mut exposed = vec!["t".to_string()];
        let (constants, render_method, template) = match render {
            RenderAttachment::Compiled(compiled) => {
                exposed.extend(compiled.exposed.iter().cloned());
                (
                    indent(&compiled.constants.join("\n"), 4),
                    Some(indent_tail(&compiled.render, 2)),
                    None,
                )
            }
            RenderAttachment::Template(template) => {
                (String::new(), None, Some(embed_template(template)))
            }
        };

        let tmpl = self.env.get_template("component.js")?;
        let module = tmpl.render(context! {
            register => &self.runtime.register,
            use_i18n => &self.runtime.use_i18n,
            i18n_global => &self.runtime.i18n_global,
            name => escape_string(name),
            constants => constants,
            messages => messages,
            exposed => exposed,
            render => render_method,
            template => template,
            script => script_members.trim(),
        })?;

        Ok(module)
    }
}

impl Default for ModuleAssembler {
    fn default() -> Self {
        Self::new(RuntimeNames::default())
    }
}

/// Escape template text for a single-quoted string literal.
///
/// Line breaks become line continuations followed by two spaces of indentation,
/// so the embedded template keeps its shape in the generated module.
pub fn embed_template(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.trim().chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\\n  "),
            _ => out.push(c),
        }
    }

    out
}

/// Escape a string for JavaScript output.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
}

/// Indent every non-empty line.
fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indent every line but the first.
fn indent_tail(text: &str, width: usize) -> String {
    match text.split_once('\n') {
        Some((first, rest)) => format!("{first}\n{}", indent(rest, width)),
        None => text.to_string(),
    }
}

const MODULE_TEMPLATE: &str = r#"{{ register }}('{{ name }}', {
  name: '{{ name }}',
  setup() {
{% if constants %}
{{ constants }}
{% endif %}
    const { t } = {{ use_i18n }}({});
    const localeMessages = {{ messages }};
    Object.keys(localeMessages).forEach((locale) => {
      {{ i18n_global }}.mergeLocaleMessage(locale, localeMessages[locale]);
    });
    return { {{ exposed|join(", ") }} };
  },
{% if render %}
  {{ render }},
{% else %}
  template: '\
  {{ template }}',
{% endif %}
{% if script %}
  {{ script }}
{% endif %}
})
"#;
