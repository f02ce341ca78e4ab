use std::path::Path;

use filever::Config;
use filever::config::{CONFIG_FILE_NAME, MatchMode, Placement};
use filever::hasher::HashAlg;
use serde::Serialize;

/// Output the filever reference document.
pub fn run(json: bool) {
    let state = gather_state(Path::new("."));

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}

// ── State gathering ───────────────────────────────────────────────────

struct CurrentState {
    config_error: Option<String>,
    config_found: bool,
    delimiter: String,
    dist: String,
    hash_alg: &'static str,
    match_mode: &'static str,
    placement: &'static str,
    src: String,
    version_size: usize,
}

fn gather_state(root: &Path) -> CurrentState {
    let config_found = root.join(CONFIG_FILE_NAME).exists();
    let (config, config_error) = match Config::load(root) {
        Ok(c) => (c, None),
        Err(e) => (Config::new(root.join("src"), root.join("dist")), Some(e.to_string())),
    };

    CurrentState {
        config_error,
        config_found,
        delimiter: config.delimiter.clone(),
        dist: config.dist.display().to_string(),
        hash_alg: match config.hash_alg {
            HashAlg::Sha256 => "sha256",
            HashAlg::Sha384 => "sha384",
            HashAlg::Sha512 => "sha512",
        },
        match_mode: match config.match_mode {
            MatchMode::Generic => "generic",
            MatchMode::Tracked => "tracked",
        },
        placement: match config.placement {
            Placement::End => "end",
            Placement::Mid => "mid",
        },
        src: config.src.display().to_string(),
        version_size: config.version_size,
    }
}

// ── Markdown output ───────────────────────────────────────────────────

fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

fn print_markdown_header(version: &str) {
    print!(
        "\
# filever {version}

Content-addressed file versioning: copy source files into a distribution
tree under names carrying a digest of their content, and rewrite references
to point at the current version.

## Naming

    app.js?fv=00000000        source file marked for versioning (placeholder token)
    app.js?fv=4mIbJJPq        end placement (default)
    app?fv=4mIbJJPq.min.js    mid placement (--mid)

Tokens are the first N characters of the base64url digest of the file's
content, using the configured hash_alg (SHA-256 by default). A source is
discovered when its name carries a token of exactly N characters.

## Workflow

    filever run                 Version sources, then rewrite references
    filever version             Version sources only
    filever discover            List sources marked for versioning
    filever decompose <path>    Show how a path splits into parts

## Configuration (.filever.toml)

    src = \"src\"                     # source root
    dist = \"dist\"                   # distribution root
    src_files = [\"app.js\"]          # explicit sources (default: discover)
    delimiter = \"?fv=\"              # token delimiter
    version_size = 8                # token length
    placement = \"end\"               # end | mid
    hash_alg = \"sha256\"             # sha256 | sha384 | sha512
    match_mode = \"tracked\"          # tracked | generic
    pattern = \"...\"                 # custom reference pattern
    unmapped = \"placeholder\"        # placeholder | leave
    include = [\"js/\"]               # only rewrite these dist paths
    exclude = [\"js/vendor/\"]        # skip these dist paths

## Current State

"
    );
}

fn print_markdown_state(state: &CurrentState) {
    if state.config_found {
        println!("Config:     {CONFIG_FILE_NAME} (found)");
    } else {
        println!("Config:     {CONFIG_FILE_NAME} (not found, using defaults)");
    }
    if let Some(e) = &state.config_error {
        println!("            {e}");
    }
    println!("Source:     {}", state.src);
    println!("Dist:       {}", state.dist);
    println!("Token:      `{}` + {} characters, {} placement", state.delimiter, state.version_size, state.placement);
    println!("Hash:       {}", state.hash_alg);
    println!("Matching:   {}", state.match_mode);
}

fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | Success |
| 1    | Completed with warnings (placeholder tokens, unmapped references) |
| 2    | Error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct InfoJson {
    current_state: StateJson,
    exit_codes: Vec<ExitCodeInfo>,
    version: String,
}

#[derive(Serialize)]
struct ExitCodeInfo {
    code: u8,
    meaning: String,
}

#[derive(Serialize)]
struct StateJson {
    config_error: Option<String>,
    config_found: bool,
    delimiter: String,
    dist: String,
    hash_alg: String,
    match_mode: String,
    placement: String,
    src: String,
    version_size: usize,
}

fn print_json(state: &CurrentState) {
    let info = InfoJson {
        current_state: StateJson {
            config_error: state.config_error.clone(),
            config_found: state.config_found,
            delimiter: state.delimiter.clone(),
            dist: state.dist.clone(),
            hash_alg: state.hash_alg.to_string(),
            match_mode: state.match_mode.to_string(),
            placement: state.placement.to_string(),
            src: state.src.clone(),
            version_size: state.version_size,
        },
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "Success".to_string() },
            ExitCodeInfo { code: 1, meaning: "Completed with warnings".to_string() },
            ExitCodeInfo { code: 2, meaning: "Error".to_string() },
        ],
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
