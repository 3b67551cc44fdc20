//! Process-wide language catalog.
//!
//! Built once on first access and never mutated afterwards; every
//! workspace instantiates its files from a deep copy of a template.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::tree::{FileNode, FileTree};

pub const DEFAULT_LANGUAGE: &str = "React.js";

/// Hard fallback when neither the files nor the template name an entry.
pub const FALLBACK_ENTRY_PATH: &str = "/src/App.js";

/// How the presentation layer previews a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewMode {
    /// Markup rendered directly from source.
    Live,
    /// Pre-built static preview; edits are not simulated.
    Static,
    /// Output produced by the execution-simulation channel.
    Simulated,
}

#[derive(Debug, Clone, Copy)]
pub struct TemplateFile {
    pub path: &'static str,
    pub code: &'static str,
    pub hidden: bool,
    pub entry: bool,
}

#[derive(Debug, Clone)]
pub struct LanguageTemplate {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub editable: bool,
    pub preview: PreviewMode,
    files: Vec<TemplateFile>,
}

impl LanguageTemplate {
    /// Deep copy of the default tree.
    pub fn instantiate(&self) -> FileTree {
        self.files
            .iter()
            .map(|f| {
                FileNode::file(f.path, f.code)
                    .with_hidden(f.hidden)
                    .with_entry_point(f.entry)
            })
            .collect()
    }

    pub fn files(&self) -> &[TemplateFile] {
        &self.files
    }

    /// The flagged entry file, else the first visible path.
    pub fn entry_path(&self) -> String {
        self.files
            .iter()
            .find(|f| f.entry)
            .map(|f| f.path.to_string())
            .or_else(|| self.instantiate().visible_paths().into_iter().next())
            .unwrap_or_else(|| FALLBACK_ENTRY_PATH.to_string())
    }

    pub fn is_simulated(&self) -> bool {
        self.preview == PreviewMode::Simulated
    }
}

#[derive(Debug)]
pub struct LanguageCatalog {
    templates: Vec<LanguageTemplate>,
}

static CATALOG: Lazy<LanguageCatalog> = Lazy::new(LanguageCatalog::builtin);

impl LanguageCatalog {
    pub fn global() -> &'static LanguageCatalog {
        &CATALOG
    }

    pub fn get(&self, id: &str) -> Option<&LanguageTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Template for `id`, or the default language's template.
    pub fn get_or_default(&self, id: &str) -> &LanguageTemplate {
        self.get(id)
            .or_else(|| self.get(DEFAULT_LANGUAGE))
            .unwrap_or(&self.templates[0])
    }

    /// Language identifiers in sorted order.
    pub fn language_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.templates.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Languages code can be converted into from `current`.
    pub fn conversion_targets(&self, current: &str) -> Vec<&'static str> {
        self.language_ids()
            .into_iter()
            .filter(|id| *id != DEFAULT_LANGUAGE && *id != current)
            .collect()
    }

    pub fn templates(&self) -> impl Iterator<Item = &LanguageTemplate> {
        self.templates.iter()
    }

    fn builtin() -> Self {
        const SIMULATED: &str = "**Editable Code/Files.** Execution is simulated.";

        fn single(path: &'static str, code: &'static str) -> Vec<TemplateFile> {
            vec![TemplateFile {
                path,
                code,
                hidden: false,
                entry: true,
            }]
        }

        let templates = vec![
            LanguageTemplate {
                id: "React.js",
                label: "React.js",
                icon: "⚛️",
                description: "React environment. **Live rendering is now a static output simulation.**",
                editable: true,
                preview: PreviewMode::Static,
                files: vec![
                    TemplateFile {
                        path: "/src/index.js",
                        code: "import React from 'react';\nimport App from './App';\n\n// React entry point (Simulated).",
                        hidden: false,
                        entry: true,
                    },
                    TemplateFile {
                        path: "/src/App.js",
                        code: REACT_APP,
                        hidden: false,
                        entry: false,
                    },
                    TemplateFile {
                        path: "/src/styles.css",
                        code: "/* Global styles for React app */\nbody { font-family: sans-serif; }",
                        hidden: false,
                        entry: false,
                    },
                    TemplateFile {
                        path: "/public/index.html",
                        code: "<!DOCTYPE html>...",
                        hidden: true,
                        entry: false,
                    },
                    TemplateFile {
                        path: "/package.json",
                        code: "{\"dependencies\": {\"react\": \"18.2.0\"}}",
                        hidden: true,
                        entry: false,
                    },
                ],
            },
            LanguageTemplate {
                id: "JavaScript",
                label: "JavaScript",
                icon: "JS",
                description: "Pure JS environment. **Execution is simulated.**",
                editable: true,
                preview: PreviewMode::Simulated,
                files: single("/index.js", "console.log(\"Hello pure JavaScript\");"),
            },
            LanguageTemplate {
                id: "HTML",
                label: "HTML",
                icon: "HTML",
                description: "HTML environment. **Live HTML rendering enabled.**",
                editable: true,
                preview: PreviewMode::Live,
                files: single(
                    "/index.html",
                    "<!DOCTYPE html>\n<html>\n<body>\n  <h1 class=\"text-2xl text-blue-500\">Pure HTML Project</h1>\n  <p>This is editable.</p>\n</body>\n</html>",
                ),
            },
            LanguageTemplate {
                id: "Python",
                label: "Python",
                icon: "🐍",
                description: SIMULATED,
                editable: true,
                preview: PreviewMode::Simulated,
                files: single(
                    "/main.py",
                    "def greet(name):\n    return f\"Hello, {name}!\"\n\n# Code is editable, but **execution is simulated**.\nprint(greet(\"Python Dev\"))",
                ),
            },
            LanguageTemplate {
                id: "Java",
                label: "Java",
                icon: "☕",
                description: SIMULATED,
                editable: true,
                preview: PreviewMode::Simulated,
                files: single(
                    "/Main.java",
                    "class Main {\n  public static void main(String[] args) {\n    System.out.println(\"Hello Java World!\");\n  }\n}",
                ),
            },
            LanguageTemplate {
                id: "C++",
                label: "C++",
                icon: "C++",
                description: SIMULATED,
                editable: true,
                preview: PreviewMode::Simulated,
                files: single(
                    "/main.cpp",
                    "#include <iostream>\n\nint main() {\n  std::cout << \"Hello C++\" << std::endl;\n  return 0;\n}",
                ),
            },
            LanguageTemplate {
                id: "C#",
                label: "C#",
                icon: "C#",
                description: SIMULATED,
                editable: true,
                preview: PreviewMode::Simulated,
                files: single("/Program.cs", "using System;\n\nConsole.WriteLine(\"Hello C#\");"),
            },
            LanguageTemplate {
                id: "Go",
                label: "Go",
                icon: "Go",
                description: SIMULATED,
                editable: true,
                preview: PreviewMode::Simulated,
                files: single(
                    "/main.go",
                    "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"Hello Go\")\n}",
                ),
            },
            LanguageTemplate {
                id: "Rust",
                label: "Rust",
                icon: "Rs",
                description: SIMULATED,
                editable: true,
                preview: PreviewMode::Simulated,
                files: single("/main.rs", "fn main() {\n    println!(\"Hello Rust!\");\n}"),
            },
        ];

        Self { templates }
    }
}

const REACT_APP: &str = r#"import React, { useState } from 'react';

// Main App Component
const App = () => {
  const [count, setCount] = useState(0);

  const increment = () => {
      setCount(c => c + 1);
  };

  return (
    <div className="flex flex-col items-center p-4 min-h-full">
      <h1 className="text-3xl font-bold mb-4 text-green-500">CipherStudio Live React App</h1>
      <p className="text-xl mb-6">Count: {count}</p>
      <button onClick={increment}>
        Increment
      </button>
      <p className="mt-8 text-sm text-gray-500">Edit code in /src/App.js to see changes here!</p>
    </div>
  );
};

export default App;"#;
