//! In-memory `.nupkg` archives.

use std::io::{Cursor, Write};

use zip::{write::SimpleFileOptions, ZipWriter};

/// Zip `entries` into a package. Names ending in `/` become directory entries.
pub fn nupkg(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
            continue;
        }
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

/// A package with one library, its documentation, a build-time assembly and a content file.
pub fn widget_package() -> Vec<u8> {
    nupkg(&[
        ("Acme.Widgets.nuspec", b"<package />"),
        ("lib/", b""),
        ("lib/net8.0/", b""),
        ("lib/net8.0/Acme.Widgets.dll", b"MZ not really a PE image"),
        (
            "lib/net8.0/Acme.Widgets.xml",
            br#"<doc><members><member name="T:Acme.Widget"><summary>A widget.</summary></member></members></doc>"#,
        ),
        ("build/Acme.Widgets.Tasks.dll", b"MZ"),
        ("content/readme.txt", b"hello"),
    ])
}
