//! Renders the `nodekeeperd(8)` manual page for packagers.

use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::format_description::well_known::Iso8601;

const EPOCH_DATE: &str = "1970-01-01";
const SECTION: &str = "8";

/// Page date, pinned by `SOURCE_DATE_EPOCH` for reproducible builds.
fn page_date() -> String {
    let Some(raw) = env::var_os("SOURCE_DATE_EPOCH") else {
        return EPOCH_DATE.to_owned();
    };
    let raw = raw.to_string_lossy();
    let formatted = raw
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|moment| moment.format(&Iso8601::DATE).ok());
    formatted.unwrap_or_else(|| {
        println!("cargo:warning=ignoring unusable SOURCE_DATE_EPOCH '{raw}'");
        EPOCH_DATE.to_owned()
    })
}

fn render_page(name: &str, version: &str, date: &str) -> String {
    let mut page = format!(
        ".TH \"{title}\" \"{SECTION}\" \"{date}\" \"{name} {version}\" \"System Administration\"\n",
        title = name.to_uppercase(),
    );
    let sections: [(&str, &str); 5] = [
        ("NAME", "\\- supervise a local Bitcoin node"),
        ("SYNOPSIS", "[\\fIOPTIONS\\fR]"),
        (
            "DESCRIPTION",
            "starts bitcoind, keeps its configuration in step with the stored\n\
             settings, and restarts it when those settings change. Node output\n\
             is forwarded to the \\fBnodekeeperd::bitcoind\\fR log target.",
        ),
        (
            "ENVIRONMENT",
            "Every option may also be set through a \\fBNODEKEEPER_\\fR prefixed\n\
             variable, for example \\fBNODEKEEPER_DATA_DIR\\fR or\n\
             \\fBNODEKEEPER_CHAIN\\fR.",
        ),
        (
            "FILES",
            ".TP\n.I bitcoin.conf\nOperator configuration; includes the managed overlay.\n\
             .TP\n.I nodekeeper.conf\nOverlay rendered from the stored settings.\n\
             .TP\n.I nodekeeper-settings.json\nStored settings.",
        ),
    ];
    for (heading, body) in sections {
        page.push_str(".SH ");
        page.push_str(heading);
        page.push('\n');
        if matches!(heading, "NAME" | "SYNOPSIS" | "DESCRIPTION") {
            page.push_str(&format!(".B {name}\n"));
        }
        page.push_str(body);
        page.push('\n');
    }
    page
}

/// `target/generated-man/<triple>/<profile>`, found by walking up from `OUT_DIR`.
fn packaging_dir(out_dir: &Path) -> PathBuf {
    let triple = env::var("TARGET").unwrap_or_else(|_| "unknown-target".to_owned());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown-profile".to_owned());
    let target_root = out_dir
        .ancestors()
        .nth(4)
        .map_or_else(|| PathBuf::from("target"), Path::to_path_buf);
    target_root
        .join("generated-man")
        .join(triple)
        .join(profile)
}

fn install(page: &str, dir: &Path, file_name: &str) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let staged = dir.join(format!(".{file_name}.partial"));
    fs::write(&staged, page)?;
    fs::rename(&staged, dir.join(file_name))
}

fn main() -> Result<(), Box<dyn Error>> {
    for variable in ["SOURCE_DATE_EPOCH", "TARGET", "PROFILE"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    let name = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| "nodekeeperd".to_owned());
    let version = env::var("CARGO_PKG_VERSION")?;
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").ok_or("OUT_DIR is not set")?);
    let page = render_page(&name, &version, &page_date());
    let file_name = format!("{name}.{SECTION}");

    install(&page, &packaging_dir(&out_dir), &file_name)?;
    if let Err(error) = install(&page, &out_dir, &file_name) {
        println!(
            "cargo:warning=could not stage {file_name} in {}: {error}",
            out_dir.display()
        );
    }
    Ok(())
}
