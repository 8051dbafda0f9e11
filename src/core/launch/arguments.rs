// ─── Launch Arguments ───
// Placeholder substitution for descriptor argument templates and the fixed
// JVM flags every launch gets.

use std::collections::BTreeMap;

/// G1 tuning passed to every game process.
pub const G1_FLAGS: [&str; 6] = [
    "-XX:+UnlockExperimentalVMOptions",
    "-XX:+UseG1GC",
    "-XX:G1NewSizePercent=20",
    "-XX:G1ReservePercent=20",
    "-XX:MaxGCPauseMillis=50",
    "-XX:G1HeapRegionSize=32M",
];

/// Properties the launcher always sets itself.
const OWNED_PROPERTIES: [&str; 4] = [
    "-Djava.library.path=",
    "-Dminecraft.launcher.brand=",
    "-Dminecraft.launcher.version=",
    "-Dminecraft.client.jar=",
];

/// `${name}` → value table.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: BTreeMap<&'static str, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Substitute every known placeholder. Arguments that still reference an
    /// unknown one are dropped together with the option they belong to.
    pub fn substitute(&self, template: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(template.len());
        for arg in template {
            let mut resolved = arg.clone();
            for (name, value) in &self.values {
                let token = format!("${{{}}}", name);
                if resolved.contains(&token) {
                    resolved = resolved.replace(&token, value);
                }
            }

            if resolved.contains("${") {
                drop_dangling_option(&mut out);
                continue;
            }
            out.push(resolved);
        }
        out
    }
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        let _ = args.pop();
    }
}

/// Descriptor JVM arguments minus the ones the launcher injects itself:
/// classpath switches (with their value) and launcher-owned properties.
pub fn filter_descriptor_jvm_args(raw_args: &[String]) -> Vec<String> {
    let mut filtered = Vec::with_capacity(raw_args.len());
    let mut i = 0;
    while i < raw_args.len() {
        let arg = &raw_args[i];
        if arg == "-cp" || arg == "-classpath" || arg == "--class-path" {
            i += 2;
            continue;
        }
        if !OWNED_PROPERTIES.iter().any(|p| arg.starts_with(p)) {
            filtered.push(arg.clone());
        }
        i += 1;
    }
    filtered
}

/// Dedicated server entry point for a client main class.
pub fn server_main_class(client_main: &str) -> String {
    match client_main {
        "net.minecraft.client.main.Main" => "net.minecraft.server.Main".to_string(),
        // Loader launchers follow the `…Client` / `…Server` convention.
        other => other.replace("Client", "Server"),
    }
}

/// Quote an argument for copy/paste into a shell.
pub fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=' | '+')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substitutes_and_drops_unknown_placeholders() {
        let values = Placeholders::new()
            .with("auth_player_name", "Steve")
            .with("version_name", "1.14.4")
            .with("game_directory", "/packs/test");

        let args = values.substitute(&strings(&[
            "--username",
            "${auth_player_name}",
            "--version",
            "${version_name}",
            "--xuid",
            "${auth_xuid}",
            "--gameDir",
            "${game_directory}",
            "--demoLabel=${unknown}",
        ]));

        assert_eq!(
            args,
            strings(&["--username", "Steve", "--version", "1.14.4", "--gameDir", "/packs/test"])
        );
    }

    #[test]
    fn repeated_placeholders_in_one_argument() {
        let values = Placeholders::new().with("natives_directory", "/tmp/n");
        let args = values.substitute(&strings(&["-Dx=${natives_directory}:${natives_directory}"]));
        assert_eq!(args, strings(&["-Dx=/tmp/n:/tmp/n"]));
    }

    #[test]
    fn descriptor_classpath_and_owned_properties_are_removed() {
        let filtered = filter_descriptor_jvm_args(&strings(&[
            "-XstartOnFirstThread",
            "-Djava.library.path=${natives_directory}",
            "-Dminecraft.launcher.brand=${launcher_name}",
            "-cp",
            "${classpath}",
            "-Dfabric.debug=true",
        ]));
        assert_eq!(filtered, strings(&["-XstartOnFirstThread", "-Dfabric.debug=true"]));
    }

    #[test]
    fn server_entry_points() {
        assert_eq!(server_main_class("net.minecraft.client.main.Main"), "net.minecraft.server.Main");
        assert_eq!(
            server_main_class("net.fabricmc.loader.launch.knot.KnotClient"),
            "net.fabricmc.loader.launch.knot.KnotServer"
        );
    }

    #[test]
    fn shell_escape_quotes_spaces() {
        assert_eq!(shell_escape("-Xss1M"), "-Xss1M");
        assert_eq!(shell_escape("/my games/mc"), "\"/my games/mc\"");
        assert_eq!(shell_escape(""), "\"\"");
    }
}
