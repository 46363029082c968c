//! `pkgpatch resolve` command.

use std::path::Path;

use crate::context::ServiceContext;
use crate::patch::PatchCollection;
use crate::project::ProjectStore;
use crate::session::PatchSession;

/// Execute the `resolve` command.
///
/// Prints a table of every resolved patch: target package, description,
/// url, and the resolver that declared it.
///
/// # Errors
///
/// Returns an error string if host metadata, configuration, or a resolver
/// is invalid.
pub fn run(ctx: &ServiceContext, project_dir: &Path) -> Result<(), String> {
    let store = ProjectStore::new(ctx, project_dir);
    let mut session = PatchSession::open(ctx, &store).map_err(|e| e.to_string())?;
    if session.config().disable_patching {
        println!("Patching is disabled.");
        return Ok(());
    }
    let collection = session.resolve().map_err(|e| e.to_string())?;
    println!("{}", format_collection(collection));
    Ok(())
}

/// Renders `collection` as an aligned table.
#[must_use]
pub fn format_collection(collection: &PatchCollection) -> String {
    if collection.is_empty() {
        return "No patches resolved.".to_string();
    }

    let rows: Vec<[&str; 4]> = collection
        .packages()
        .flat_map(|package| collection.patches_for(package))
        .map(|p| [p.package.as_str(), p.description.as_str(), p.url.as_str(), p.resolver.as_str()])
        .collect();

    let headers = ["PACKAGE", "DESCRIPTION", "URL", "RESOLVER"];
    let widths: Vec<usize> = (0..4)
        .map(|i| rows.iter().map(|r| r[i].len()).max().unwrap_or(0).max(headers[i].len()))
        .collect();
    let line = |cells: [&str; 4]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ");
    let mut out = vec![line(headers), separator];
    out.extend(rows.into_iter().map(line));
    out.push(String::new());
    out.push(format!("{} patch(es) total.", collection.len()));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;
    use crate::testing::MemFs;

    #[test]
    fn empty_collection_message() {
        assert_eq!(format_collection(&PatchCollection::new()), "No patches resolved.");
    }

    #[test]
    fn table_lists_patches_in_order() {
        let mut collection = PatchCollection::new();
        collection.add_patch(Patch::new("my/pkg", "first", "one.patch", "root-config"));
        collection.add_patch(Patch::new("my/pkg", "second", "https://x/two.patch", "dependencies"));

        let table = format_collection(&collection);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("PACKAGE"));
        assert!(lines[2].contains("first") && lines[2].contains("root-config"));
        assert!(lines[3].contains("second") && lines[3].contains("dependencies"));
        assert!(table.ends_with("2 patch(es) total."));
    }

    #[test]
    fn resolve_command_reads_project() {
        let fs = MemFs::new();
        fs.insert(
            "/proj/project.json",
            r#"{"name": "acme/site", "extra": {"patches": {"my/pkg": {"fix": "fix.patch"}}}}"#,
        );
        let ctx = ServiceContext::in_memory(fs);
        assert!(run(&ctx, Path::new("/proj")).is_ok());
    }

    #[test]
    fn resolve_command_reports_bad_manifest() {
        let fs = MemFs::new();
        fs.insert("/proj/project.json", r#"{"extra": {"patches": {"my/pkg": 42}}}"#);
        let ctx = ServiceContext::in_memory(fs);
        let err = run(&ctx, Path::new("/proj")).unwrap_err();
        assert!(err.contains("my/pkg"), "{err}");
    }
}
