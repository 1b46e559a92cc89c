use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ProjectConfig;
use crate::errors::PlistError;
use crate::value::{Dictionary, PlistValue};
use crate::xml;

pub const DEFAULT_EXECUTABLE: &str = "JavaLauncher";

/// Keys the launcher reads back at runtime.
pub mod keys {
    pub const CF_BUNDLE_NAME: &str = "CFBundleName";
    pub const CF_BUNDLE_ICON_FILE: &str = "CFBundleIconFile";
    pub const JVM_VERSION: &str = "JVMVersion";
    pub const JVM_MAIN_CLASS_NAME: &str = "JVMMainClassName";
    pub const JVM_MAIN_MODULE_NAME: &str = "JVMMainModuleName";
    pub const JVM_OPTIONS: &str = "JVMOptions";
    pub const JVM_ARGUMENTS: &str = "JVMArguments";
    pub const JVM_RUNTIME_PATH: &str = "JVMRuntimePath";
    pub const JVM_LOG_LEVEL: &str = "JVMLogLevel";
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DocumentType {
    #[serde(rename = "CFBundleTypeExtensions", default)]
    pub extensions: Vec<String>,
    #[serde(rename = "CFBundleTypeName")]
    pub name: Option<String>,
    #[serde(rename = "CFBundleTypeOSTypes", default)]
    pub os_types: Vec<String>,
    #[serde(rename = "CFBundleTypeRole")]
    pub role: Option<String>,
}

/// Everything that ends up in `Contents/Info.plist`.
///
/// Field names on the TOML side are the Apple key names so a `[plist]` table
/// reads like the generated document.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlistConfiguration {
    #[serde(rename = "CFBundleIconFile")]
    pub icon_file: Option<String>,
    #[serde(rename = "CFBundleIdentifier")]
    pub identifier: Option<String>,
    #[serde(rename = "CFBundleDisplayName")]
    pub display_name: Option<String>,
    #[serde(rename = "CFBundleName")]
    pub name: Option<String>,
    #[serde(rename = "CFBundleShortVersionString")]
    pub short_version: Option<String>,
    #[serde(rename = "CFBundleExecutable")]
    pub executable: Option<String>,
    #[serde(rename = "CFBundleDevelopmentRegion")]
    pub development_region: Option<String>,
    #[serde(rename = "CFBundleURLTypes", default)]
    pub url_types: Vec<String>,
    #[serde(rename = "CFBundleDocumentTypes", default)]
    pub document_types: Vec<DocumentType>,
    #[serde(rename = "JVMVersion")]
    pub jvm_version: Option<String>,
    #[serde(rename = "JVMMainClassName")]
    pub main_class_name: Option<String>,
    #[serde(rename = "JVMMainModuleName")]
    pub main_module_name: Option<String>,
    #[serde(rename = "JVMOptions", default)]
    pub jvm_options: Vec<String>,
    #[serde(rename = "JVMArguments", default)]
    pub jvm_arguments: Vec<String>,
    #[serde(rename = "JVMRuntimePath")]
    pub runtime_path: Option<String>,
    #[serde(rename = "JVMLogLevel")]
    pub log_level: Option<String>,
    #[serde(rename = "NSHighResolutionCapable", default = "default_true")]
    pub high_resolution_capable: bool,
    #[serde(
        rename = "NSSupportsAutomaticGraphicsSwitching",
        default = "default_true"
    )]
    pub automatic_graphics_switching: bool,
    #[serde(rename = "LSUIElement")]
    pub ui_element: Option<bool>,
    /// Extra string keys copied verbatim, in key order.
    #[serde(default)]
    pub additional: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Default for PlistConfiguration {
    fn default() -> Self {
        Self {
            icon_file: None,
            identifier: None,
            display_name: None,
            name: None,
            short_version: None,
            executable: None,
            development_region: None,
            url_types: Vec::new(),
            document_types: Vec::new(),
            jvm_version: None,
            main_class_name: None,
            main_module_name: None,
            jvm_options: Vec::new(),
            jvm_arguments: Vec::new(),
            runtime_path: None,
            log_level: None,
            high_resolution_capable: true,
            automatic_graphics_switching: true,
            ui_element: None,
            additional: BTreeMap::new(),
        }
    }
}

/// How the application is put on the JVM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Classpath,
    Module,
}

impl PlistConfiguration {
    /// Exactly one of main class / main module must be configured.
    pub fn validate(&self) -> Result<LaunchMode, PlistError> {
        let class = non_empty(&self.main_class_name);
        let module = non_empty(&self.main_module_name);
        match (class, module) {
            (None, None) => Err(PlistError::Invalid(
                "neither 'JVMMainClassName' nor 'JVMMainModuleName' have been defined".to_string(),
            )),
            (Some(_), Some(_)) => Err(PlistError::Invalid(
                "both 'JVMMainClassName' and 'JVMMainModuleName' have been defined; \
                 define only one to select a classpath or a module application"
                    .to_string(),
            )),
            (Some(_), None) => Ok(LaunchMode::Classpath),
            (None, Some(_)) => Ok(LaunchMode::Module),
        }
    }

    pub fn apply_defaults(&mut self, project: &ProjectConfig) {
        fill_default(&mut self.display_name, &project.name);
        fill_default(&mut self.name, &project.name);
        fill_default(
            &mut self.identifier,
            &format!("{}.{}", project.group_id, project.artifact_id),
        );
        fill_default(&mut self.short_version, &project.version);
        fill_default(&mut self.executable, DEFAULT_EXECUTABLE);
    }

    pub fn executable_name(&self) -> &str {
        non_empty(&self.executable).unwrap_or(DEFAULT_EXECUTABLE)
    }

    pub fn to_dictionary(&self, additional: &[(String, String)]) -> Dictionary {
        let mut dict = Dictionary::new();
        put_string(&mut dict, "CFBundleDisplayName", &self.display_name);
        put_string(&mut dict, "CFBundleExecutable", &self.executable);
        put_string(&mut dict, "CFBundleIdentifier", &self.identifier);
        put_string(&mut dict, "CFBundleName", &self.name);
        put_string(&mut dict, "CFBundleShortVersionString", &self.short_version);
        put_string(&mut dict, "CFBundleDevelopmentRegion", &self.development_region);

        let schemes = string_array(&self.url_types);
        if !schemes.is_empty() {
            let mut url_type = Dictionary::new();
            url_type.insert("CFBundleURLSchemes", PlistValue::Array(schemes));
            dict.insert("CFBundleURLTypes", PlistValue::Array(vec![url_type.into()]));
        }

        if !self.document_types.is_empty() {
            let types = self
                .document_types
                .iter()
                .map(|doc| {
                    let mut entry = Dictionary::new();
                    put_array(&mut entry, "CFBundleTypeExtensions", &doc.extensions);
                    put_string(&mut entry, "CFBundleTypeName", &doc.name);
                    put_array(&mut entry, "CFBundleTypeOSTypes", &doc.os_types);
                    put_string(&mut entry, "CFBundleTypeRole", &doc.role);
                    PlistValue::Dict(entry)
                })
                .collect();
            dict.insert("CFBundleDocumentTypes", PlistValue::Array(types));
        }

        put_string(&mut dict, keys::JVM_MAIN_CLASS_NAME, &self.main_class_name);
        put_string(&mut dict, keys::JVM_MAIN_MODULE_NAME, &self.main_module_name);
        put_array(&mut dict, keys::JVM_OPTIONS, &self.jvm_options);
        put_array(&mut dict, keys::JVM_ARGUMENTS, &self.jvm_arguments);
        put_string(&mut dict, keys::JVM_RUNTIME_PATH, &self.runtime_path);
        put_string(&mut dict, keys::JVM_VERSION, &self.jvm_version);
        put_string(&mut dict, keys::JVM_LOG_LEVEL, &self.log_level);

        dict.insert("NSHighResolutionCapable", self.high_resolution_capable);
        dict.insert(
            "NSSupportsAutomaticGraphicsSwitching",
            self.automatic_graphics_switching,
        );
        if let Some(ui_element) = self.ui_element {
            dict.insert("LSUIElement", ui_element);
        }

        for (key, value) in self.additional.iter().chain(
            additional.iter().map(|(key, value)| (key, value)),
        ) {
            if !value.is_empty() {
                dict.insert(key.clone(), value.clone());
            }
        }
        dict
    }

    pub fn to_xml_string(&self, additional: &[(String, String)]) -> String {
        xml::write_plist(&self.to_dictionary(additional))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn fill_default(slot: &mut Option<String>, fallback: &str) {
    if non_empty(slot).is_none() && !fallback.is_empty() {
        *slot = Some(fallback.to_string());
    }
}

fn put_string(dict: &mut Dictionary, key: &str, value: &Option<String>) {
    if let Some(value) = non_empty(value) {
        dict.insert(key, value);
    }
}

fn string_array(values: &[String]) -> Vec<PlistValue> {
    values
        .iter()
        .filter(|value| !value.is_empty())
        .map(|value| PlistValue::String(value.clone()))
        .collect()
}

fn put_array(dict: &mut Dictionary, key: &str, values: &[String]) {
    if !values.is_empty() {
        dict.insert(key, PlistValue::Array(string_array(values)));
    }
}
