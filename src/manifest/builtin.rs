//! The compiled-in list of specification documents.
//!
//! Destination file names are relied on by readers of the archive; rename
//! them only together with everything that links to them.

use std::path::PathBuf;

use super::{BuildRecipe, ManifestEntry};

const UCLIBC_DOCS: &str = "https://www.uclibc.org/docs";

fn uclibc(label: &str, file: &str, dest: &str) -> ManifestEntry {
    ManifestEntry::url(label, format!("{UCLIBC_DOCS}/{file}"), dest)
}

/// Returns the built-in manifest entries in fetch order.
#[must_use]
pub fn builtin_entries() -> Vec<ManifestEntry> {
    vec![
        // Generic ELF and System V ABI
        ManifestEntry::url(
            "elf",
            "https://refspecs.linuxfoundation.org/elf/elf.pdf",
            "elf.pdf",
        ),
        ManifestEntry::html_book(
            "gabi",
            "https://www.sco.com/developers/gabi/latest/contents.html",
            "gabi.pdf",
        ),
        // Processor supplements
        uclibc("i386", "psABI-i386.pdf", "i386-abi.pdf"),
        ManifestEntry::git_build(
            "x86-64",
            "https://gitlab.com/x86-psABIs/x86-64-ABI.git",
            BuildRecipe {
                subdir: Some(PathBuf::from("x86-64-ABI")),
                target: None,
                artifact: PathBuf::from("x86-64-ABI/abi.pdf"),
            },
            "x86-64-abi.pdf",
        ),
        uclibc("m68k", "psABI-m68k.pdf", "m68k-abi.pdf"),
        uclibc("mips", "psABI-mips.pdf", "mips.pdf"),
        uclibc("ppc", "psABI-ppc.pdf", "ppc-abi.pdf"),
        uclibc("ppc64", "psABI-ppc64.pdf", "ppc64-abi.pdf"),
        uclibc("s390", "psABI-s390.pdf", "s390-abi.pdf"),
        uclibc("sparc", "psABI-sparc.pdf", "sparc-abi.pdf"),
        uclibc("parisc", "psABI-parisc.pdf", "parisc-abi.pdf"),
        ManifestEntry::github_release("arm-aaelf32", "ARM-software/abi-aa", "aaelf32*.pdf", "."),
        ManifestEntry::github_release("arm-aaelf64", "ARM-software/abi-aa", "aaelf64*.pdf", "."),
        ManifestEntry::github_release(
            "riscv",
            "riscv-non-isa/riscv-elf-psabi-doc",
            "riscv-abi*.pdf",
            ".",
        ),
        // Thread-local storage and FDPIC variants
        uclibc("tls", "tls.pdf", "tls.pdf"),
        uclibc("tls-ppc", "tls-ppc.txt", "tls-ppc.txt"),
        uclibc("tls-ppc64", "tls-ppc64.txt", "tls-ppc64.txt"),
        uclibc("fdpic-frv", "fdpic-frv.txt", "fdpic-frv.txt"),
        uclibc("fdpic-sh", "fdpic-sh.txt", "fdpic-sh.txt"),
    ]
}
