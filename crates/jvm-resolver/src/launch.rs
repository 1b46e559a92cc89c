use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use bundle_model::{Dictionary, keys};
use walkdir::WalkDir;

use crate::errors::JvmError;

const APP_ROOT_TOKENS: &[&str] = &["${APP_ROOT}", "$APP_ROOT"];

/// The full java command line for a bundled application.
///
/// Arguments stay `OsString` end to end so non-UTF-8 paths and user
/// arguments reach the child unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    program: PathBuf,
    args: Vec<OsString>,
}

impl LaunchPlan {
    /// Build the command line from the bundle's `Info.plist` dictionary.
    ///
    /// `contents_dir` is `<App>.app/Contents`; `user_args` are the launcher's
    /// own arguments without argv[0].
    pub fn from_bundle<I, S>(
        contents_dir: &Path,
        dictionary: &Dictionary,
        jvm_home: &Path,
        user_args: I,
    ) -> Result<Self, JvmError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let app_root = contents_dir.parent().unwrap_or(contents_dir);
        let program = jvm_home.join("bin").join("java");
        let mut args: Vec<OsString> = dictionary
            .strings(keys::JVM_OPTIONS)
            .iter()
            .map(|option| expand_app_root(option, app_root))
            .collect();

        if cfg!(target_os = "macos") {
            if let Some(name) = dictionary.string(keys::CF_BUNDLE_NAME) {
                args.push(format!("-Xdock:name={name}").into());
            }
            if let Some(icon) = dictionary.string(keys::CF_BUNDLE_ICON_FILE) {
                let mut dock_icon = OsString::from("-Xdock:icon=");
                dock_icon.push(contents_dir.join("Resources").join(icon));
                args.push(dock_icon);
            }
        }

        let main_class = dictionary.string(keys::JVM_MAIN_CLASS_NAME);
        let main_module = dictionary.string(keys::JVM_MAIN_MODULE_NAME);
        match (main_class, main_module) {
            (Some(main_class), None) => {
                let classpath_dir = contents_dir.join("Java").join("classpath");
                let jars = collect_jars(&classpath_dir);
                if jars.is_empty() {
                    return Err(JvmError::Launch(format!(
                        "no jars found below {}",
                        classpath_dir.display()
                    )));
                }
                args.push("-cp".into());
                args.push(join_classpath(&jars));
                args.push(main_class.into());
            }
            (None, Some(main_module)) => {
                args.push("--module-path".into());
                args.push(contents_dir.join("Java").join("modules").into_os_string());
                args.push("-m".into());
                args.push(main_module.into());
            }
            (None, None) => {
                return Err(JvmError::Launch(
                    "neither JVMMainClassName nor JVMMainModuleName is set".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(JvmError::Launch(
                    "both JVMMainClassName and JVMMainModuleName are set".to_string(),
                ));
            }
        }

        args.extend(
            dictionary
                .strings(keys::JVM_ARGUMENTS)
                .iter()
                .map(|argument| expand_app_root(argument, app_root)),
        );
        // Finder used to pass a process serial number; the app never wants it.
        args.extend(
            user_args
                .into_iter()
                .map(Into::<OsString>::into)
                .filter(|arg| !is_process_serial_number(arg)),
        );

        Ok(Self { program, args })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments after the java binary.
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

fn is_process_serial_number(arg: &OsStr) -> bool {
    arg.as_encoded_bytes().starts_with(b"-psn_")
}

fn expand_app_root(value: &str, app_root: &Path) -> OsString {
    let mut expanded = OsString::new();
    let mut rest = value;
    while let Some((start, token)) = next_app_root_token(rest) {
        expanded.push(&rest[..start]);
        expanded.push(app_root);
        rest = &rest[start + token.len()..];
    }
    expanded.push(rest);
    expanded
}

fn next_app_root_token(value: &str) -> Option<(usize, &'static str)> {
    APP_ROOT_TOKENS
        .iter()
        .filter_map(|token| value.find(token).map(|start| (start, *token)))
        .min_by_key(|(start, _)| *start)
}

fn collect_jars(dir: &Path) -> Vec<PathBuf> {
    let mut jars: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
        })
        .collect();
    jars.sort();
    jars
}

fn join_classpath(jars: &[PathBuf]) -> OsString {
    let mut classpath = OsString::new();
    for (index, jar) in jars.iter().enumerate() {
        if index > 0 {
            classpath.push(":");
        }
        classpath.push(jar);
    }
    classpath
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundle_model::PlistValue;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("jvm-launch-{prefix}-{nanos}"))
    }

    fn os_strings(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    fn module_dictionary() -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert(keys::JVM_MAIN_MODULE_NAME, "com.example/com.example.Main");
        dict
    }

    #[test]
    fn classpath_plan_orders_options_main_class_and_arguments() {
        let root = unique_temp_dir("classpath");
        let contents = root.join("Example.app").join("Contents");
        let classpath = contents.join("Java").join("classpath");
        fs::create_dir_all(classpath.join("org").join("b")).expect("create b");
        fs::create_dir_all(classpath.join("org").join("a")).expect("create a");
        fs::write(classpath.join("org").join("b").join("b-1.jar"), b"").expect("write b");
        fs::write(classpath.join("org").join("a").join("a-1.jar"), b"").expect("write a");
        fs::write(classpath.join("README.txt"), b"").expect("write readme");

        let mut dict = Dictionary::new();
        dict.insert(keys::JVM_MAIN_CLASS_NAME, "com.example.Main");
        dict.insert(
            keys::JVM_OPTIONS,
            PlistValue::Array(vec!["-Dapp.root=${APP_ROOT}/lib".into(), "-Xmx256m".into()]),
        );
        dict.insert(keys::JVM_ARGUMENTS, PlistValue::Array(vec!["--verbose".into()]));

        let plan = LaunchPlan::from_bundle(
            &contents,
            &dict,
            Path::new("/jvm/home"),
            vec!["-psn_0_12345", "file.txt"],
        )
        .expect("plan");

        assert_eq!(plan.program(), Path::new("/jvm/home/bin/java"));
        let args = plan.args();
        assert_eq!(
            args[0],
            OsString::from(format!("-Dapp.root={}/lib", root.join("Example.app").display()))
        );
        assert_eq!(args[1], OsString::from("-Xmx256m"));

        let cp_index = args.iter().position(|arg| arg == "-cp").expect("-cp");
        let expected_cp = format!(
            "{}:{}",
            classpath.join("org").join("a").join("a-1.jar").display(),
            classpath.join("org").join("b").join("b-1.jar").display()
        );
        assert_eq!(args[cp_index + 1], OsString::from(expected_cp));
        assert_eq!(args[cp_index + 2], OsString::from("com.example.Main"));
        assert_eq!(args[cp_index + 3..].to_vec(), os_strings(&["--verbose", "file.txt"]));

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn module_plan_uses_module_path() {
        let contents = PathBuf::from("/Applications/Example.app/Contents");
        let plan = LaunchPlan::from_bundle(
            &contents,
            &module_dictionary(),
            Path::new("/jvm"),
            Vec::<OsString>::new(),
        )
        .expect("plan");

        let args = plan.args();
        assert_eq!(
            args[args.len() - 4..].to_vec(),
            os_strings(&[
                "--module-path",
                "/Applications/Example.app/Contents/Java/modules",
                "-m",
                "com.example/com.example.Main",
            ])
        );
        assert_eq!(plan.command().get_program(), OsStr::new("/jvm/bin/java"));
    }

    #[test]
    fn app_root_expands_every_occurrence() {
        let expanded = expand_app_root("$APP_ROOT:${APP_ROOT}/x", Path::new("/A.app"));
        assert_eq!(expanded, OsString::from("/A.app:/A.app/x"));
        assert_eq!(expand_app_root("plain", Path::new("/A.app")), OsString::from("plain"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_user_arguments_pass_through_unchanged() {
        use std::os::unix::ffi::OsStringExt;

        let file_name = OsString::from_vec(b"caf\xe9.txt".to_vec());
        let serial = OsString::from_vec(b"-psn_0_\xff".to_vec());
        let plan = LaunchPlan::from_bundle(
            Path::new("/Applications/Example.app/Contents"),
            &module_dictionary(),
            Path::new("/jvm"),
            vec![serial, file_name.clone()],
        )
        .expect("plan");

        assert_eq!(plan.args().last(), Some(&file_name));
        assert!(!plan.args().iter().any(|arg| is_process_serial_number(arg)));
        let command = plan.command();
        assert_eq!(command.get_args().last(), Some(file_name.as_os_str()));
    }

    #[test]
    fn missing_entry_point_or_jars_is_an_error() {
        let contents = unique_temp_dir("empty").join("Contents");
        let no_args = Vec::<OsString>::new;
        let dict = Dictionary::new();
        assert!(LaunchPlan::from_bundle(&contents, &dict, Path::new("/jvm"), no_args()).is_err());

        let mut dict = Dictionary::new();
        dict.insert(keys::JVM_MAIN_CLASS_NAME, "com.example.Main");
        let err = LaunchPlan::from_bundle(&contents, &dict, Path::new("/jvm"), no_args())
            .expect_err("no jars");
        assert!(err.to_string().contains("no jars"));
    }
}
