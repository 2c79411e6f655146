//! Module/controller/action resolution for paths no route matched.
//!
//! ```text
//! /                  → default controller, default action
//! /user              → {root}.controllers.UserController, default action
//! /user/show         → {root}.controllers.UserController, action `show`
//! /admin/user/show   → {root}.modules.admin.controllers.UserController, `show`
//! /a/b/c/d           → not found
//! ```

use crate::compiler::lcfirst;
use crate::config::RouterConfig;

/// The result of convention resolution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mca {
    /// Empty outside modules.
    pub module: String,
    pub controller: String,
    pub action: String,
    /// Fully qualified class name to look up in the registry.
    pub controller_class: String,
}

/// Maps request paths to controller classes by naming convention.
#[derive(Clone, Debug)]
pub struct ConventionResolver {
    root_namespace: String,
    default_controller: String,
    default_action: String,
}

impl ConventionResolver {
    /// `default_controller` falls back to `{root}.controllers.IndexController`.
    pub fn new(root_namespace: impl Into<String>, default_controller: Option<String>, default_action: impl Into<String>) -> Self {
        let root_namespace = root_namespace.into();
        let default_controller = default_controller
            .unwrap_or_else(|| format!("{root_namespace}.controllers.IndexController"));
        Self { root_namespace, default_controller, default_action: default_action.into() }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        Self::new(
            config.root_namespace.clone(),
            config.default_controller.clone(),
            config.default_action.clone(),
        )
    }

    pub fn root_namespace(&self) -> &str { &self.root_namespace }
    pub fn default_controller(&self) -> &str { &self.default_controller }
    pub fn default_action(&self) -> &str { &self.default_action }

    /// Resolves a normalized path. Returns `None` for more than three
    /// segments.
    pub fn resolve(&self, path: &str) -> Option<Mca> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Some(Mca {
                module: String::new(),
                controller: controller_name(&self.default_controller),
                action: self.default_action.clone(),
                controller_class: self.default_controller.clone(),
            });
        }

        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [controller]                 => Some(self.mca("", controller, &self.default_action)),
            [controller, action]         => Some(self.mca("", controller, action)),
            [module, controller, action] => Some(self.mca(module, controller, action)),
            _                            => None,
        }
    }

    /// `{root}.controllers.{Ucfirst}Controller`, or the module-scoped form.
    pub fn controller_class(&self, module: &str, controller: &str) -> String {
        let root = &self.root_namespace;
        let class = ucfirst(controller);
        if module.is_empty() {
            format!("{root}.controllers.{class}Controller")
        } else {
            format!("{root}.modules.{module}.controllers.{class}Controller")
        }
    }

    fn mca(&self, module: &str, controller: &str, action: &str) -> Mca {
        Mca {
            module: module.to_owned(),
            controller: controller.to_owned(),
            action: action.to_owned(),
            controller_class: self.controller_class(module, controller),
        }
    }
}

pub(crate) fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None        => String::new(),
    }
}

/// `app.controllers.UserController` → `user`.
fn controller_name(class: &str) -> String {
    let short = class.rsplit('.').next().unwrap_or(class);
    lcfirst(short.strip_suffix("Controller").unwrap_or(short))
}
