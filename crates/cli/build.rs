use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let dir_arg = |arg: clap::Arg| arg.value_name("DIR").value_parser(clap::value_parser!(PathBuf));

    let mut cmd = clap::Command::new("folio")
        .version("1.0.0")
        .author("Folio Contributors")
        .about("Convert HTML documentation trees to Markdown")
        .arg(dir_arg(clap::arg!(-i --input <DIR> "Root directory of the HTML documentation")))
        .arg(dir_arg(clap::arg!(-o --output <DIR> "Directory to write the Markdown tree to")))
        .arg(dir_arg(clap::arg!(--static_dir <DIR> "Canonical image directory")))
        .arg(clap::arg!(-p --project <NAME> "Project name used in image URLs").value_name("NAME"))
        .arg(clap::arg!(--validate "Validate the generated tree and exit non-zero on errors"))
        .arg(clap::arg!(--force "Write into an existing, non-empty output directory"))
        .arg(clap::arg!(--frontmatter "Include TOML frontmatter in every document"))
        .arg(clap::arg!(--no_assets "Do not copy non-HTML, non-image files"))
        .arg(clap::arg!(--keep_unreferenced "Keep images in the canonical directory that this run did not use"))
        .arg(clap::arg!(--json "Print the conversion report as JSON on stdout"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "folio", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "folio", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "folio", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "folio", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
