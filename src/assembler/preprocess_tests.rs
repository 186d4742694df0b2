// Include expansion tests, using an in-memory file reader

#[cfg(test)]
mod tests {
    use crate::assembler::error::{AssemblerError, SourceLocation};
    use crate::assembler::preprocess::{preprocess, FileReader, SourceMap};
    use crate::assembler::Assembler;
    use std::collections::HashMap;
    use std::io;
    use std::path::{Path, PathBuf};
    use test_log::test;

    #[derive(Default)]
    struct MemoryReader {
        files: HashMap<PathBuf, String>,
    }

    impl MemoryReader {
        fn with(mut self, path: &str, contents: &str) -> Self {
            self.files.insert(PathBuf::from(path), contents.to_string());
            self
        }
    }

    impl FileReader for MemoryReader {
        fn read(&self, path: &Path) -> io::Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }

    #[test]
    fn test_text_without_includes_is_unchanged() {
        let reader = MemoryReader::default();
        let source = preprocess("main.dasm", "SET A, 1\r\nSET B, 2", Path::new(""), &reader).unwrap();
        assert_eq!(source.text, "SET A, 1\nSET B, 2");
        assert_eq!(source.map, SourceMap::for_text("main.dasm", "SET A, 1\nSET B, 2"));
        assert!(source.warnings.is_empty());
    }

    #[test]
    fn test_include_expands_in_place() {
        let reader = MemoryReader::default().with("lib/util.dasm", "SET X, 1\nSET Y, 2");
        let source = preprocess(
            "main.dasm",
            "SET A, 1\n.include \"util.dasm\"\nSET B, 2",
            Path::new("lib"),
            &reader,
        )
        .unwrap();

        assert_eq!(source.text, "SET A, 1\nSET X, 1\nSET Y, 2\nSET B, 2");
        assert_eq!(source.map.len(), 4);
        assert_eq!(source.map.location(1), SourceLocation::new("main.dasm", 1));
        assert_eq!(source.map.location(2), SourceLocation::new("lib/util.dasm", 1));
        assert_eq!(source.map.location(3), SourceLocation::new("lib/util.dasm", 2));
        assert_eq!(source.map.location(4), SourceLocation::new("main.dasm", 3));
    }

    #[test]
    fn test_nested_includes_resolve_from_root_directory() {
        let reader = MemoryReader::default()
            .with("a.dasm", "#include \"b.dasm\" ; pulls in b\nDAT 1")
            .with("b.dasm", "DAT 2");
        let source = preprocess("main.dasm", "#INCLUDE \"a.dasm\"", Path::new(""), &reader).unwrap();
        assert_eq!(source.text, "DAT 2\nDAT 1");
        assert_eq!(source.map.location(1), SourceLocation::new("b.dasm", 1));
    }

    #[test]
    fn test_repeated_include_is_ignored_with_warning() {
        let reader = MemoryReader::default().with("defs.dasm", "DAT 7");
        let source = preprocess(
            "main.dasm",
            ".include \"defs.dasm\"\n.include \"defs.dasm\"",
            Path::new(""),
            &reader,
        )
        .unwrap();

        assert_eq!(source.text, "DAT 7\n");
        assert_eq!(source.warnings.len(), 1);
        assert_eq!(
            source.warnings[0].message,
            "Ignoring \"defs.dasm\" because it was included more than once."
        );
        assert_eq!(source.warnings[0].line, 2);
        assert_eq!(source.warnings[0].file, "main.dasm");
    }

    #[test]
    fn test_self_include_is_ignored() {
        let reader = MemoryReader::default();
        let source = preprocess("main.dasm", ".include \"main.dasm\"\nDAT 1", Path::new(""), &reader).unwrap();
        assert_eq!(source.text, "\nDAT 1");
        assert_eq!(source.warnings.len(), 1);
    }

    #[test]
    fn test_missing_include() {
        let reader = MemoryReader::default();
        let err = preprocess("main.dasm", "DAT 0\n.include \"gone.dasm\"", Path::new(""), &reader).unwrap_err();
        assert!(matches!(err, AssemblerError::Resource(_, _)));
        assert_eq!(err.location(), &SourceLocation::new("main.dasm", 2));
        assert!(err.message().contains("gone.dasm"));
    }

    #[test]
    fn test_include_without_quotes() {
        let reader = MemoryReader::default();
        let err = preprocess("main.dasm", ".include <lib.dasm>", Path::new(""), &reader).unwrap_err();
        assert_eq!(
            err,
            AssemblerError::Directive(
                "Not implemented: includes with parameters other than \"<filename>\".".to_string(),
                SourceLocation::new("main.dasm", 1)
            )
        );
    }

    #[test]
    fn test_similar_directive_names_are_not_includes() {
        let reader = MemoryReader::default();
        let source = preprocess("main.dasm", ".includes \"x\"", Path::new(""), &reader).unwrap();
        assert_eq!(source.text, ".includes \"x\"");
    }

    #[test]
    fn test_errors_point_into_included_file() {
        let reader = MemoryReader::default().with("src/bad.dasm", "SET A, 1\nSET A");
        let err = Assembler::new()
            .assemble_text(
                "src/main.dasm",
                "DAT 0\n.include \"bad.dasm\"\nDAT 1",
                Path::new("src"),
                &reader,
            )
            .unwrap_err();
        assert_eq!(err.location(), &SourceLocation::new("src/bad.dasm", 2));
    }

    #[test]
    fn test_assembled_lines_map_to_included_file() {
        let reader = MemoryReader::default().with("lib.dasm", ":helper SET PC, POP");
        let output = Assembler::new()
            .assemble_text(
                "main.dasm",
                "JSR helper\n.include \"lib.dasm\"\n.include \"lib.dasm\"",
                Path::new(""),
                &reader,
            )
            .unwrap();
        assert_eq!(output.label("helper"), Some(2));
        assert_eq!(
            output.address_to_line.get(&2),
            Some(&SourceLocation::new("lib.dasm", 1))
        );
        assert_eq!(output.warnings.len(), 1);
    }

    #[test]
    fn test_assemble_file_through_reader() {
        let reader = MemoryReader::default()
            .with("prog/main.dasm", ".include \"consts.dasm\"\nSET A, value")
            .with("prog/consts.dasm", ":value DAT 0x1234");
        let output = Assembler::new()
            .assemble_file(Path::new("prog/main.dasm"), &reader)
            .unwrap();
        assert_eq!(output.words(), &[0x1234, 0x7c01, 0x0000]);
    }

    #[test]
    fn test_assemble_missing_file() {
        let reader = MemoryReader::default();
        let err = Assembler::new()
            .assemble_file(Path::new("nothing.dasm"), &reader)
            .unwrap_err();
        assert!(matches!(err, AssemblerError::Resource(_, _)));
    }
}
