/// Persona for every completion call
pub const SYSTEM_PERSONA: &str = "Eres un experto en documentación de software y análisis de código. \
Analiza el código proporcionado y genera documentación clara y concisa.";

/// Delimiter prefix the model must write before each generated file
pub const FILE_DELIMITER_PREFIX: &str = "---ARCHIVO: ";

/// Delimiter suffix closing the file name
pub const FILE_DELIMITER_SUFFIX: &str = "---";

/// File the model falls back to when it cannot split its answer
pub const FALLBACK_FILE_NAME: &str = "error.md";

/// Fixed content of the fallback file
pub const FALLBACK_SENTINEL: &str = "No fue posible generar los archivos solicitados por separado.";

/// Output contract appended to the persona
pub const OUTPUT_CONTRACT: &str = r#"
Formato de respuesta:
- Si se solicitan varios archivos, escribe antes del contenido de cada uno una línea exacta con el formato
  ---ARCHIVO: <nombre_del_archivo>---
  y a continuación su contenido, sin texto adicional entre archivos.
- Si se solicita un solo documento, responde solo con su contenido.
- Los diagramas deben ir en bloques de código ```mermaid.
- Si no puedes separar la respuesta en archivos, responde únicamente con
  ---ARCHIVO: error.md---
  No fue posible generar los archivos solicitados por separado."#;

/// Separator between the instruction and the code in the user message
pub const CODE_SECTION_HEADER: &str = "Código a analizar:";

/// Full system prompt: persona followed by the output contract
pub fn system_prompt() -> String {
    format!("{}\n{}", SYSTEM_PERSONA, OUTPUT_CONTRACT)
}

/// Renders the `---ARCHIVO: <name>---` line for a file
pub fn file_delimiter(name: &str) -> String {
    format!("{}{}{}", FILE_DELIMITER_PREFIX, name, FILE_DELIMITER_SUFFIX)
}

/// Instruction for chunk `index` (0-based) out of `total`
///
/// Single-chunk requests keep the instruction untouched.
pub fn chunk_instruction(instruction: &str, index: usize, total: usize) -> String {
    if total > 1 {
        format!("{} (Parte {} de {} del código)", instruction, index + 1, total)
    } else {
        instruction.to_string()
    }
}

/// User message combining the instruction and a chunk of code
pub fn user_prompt(instruction: &str, chunk: &str) -> String {
    if chunk.is_empty() {
        instruction.to_string()
    } else {
        format!("{}\n\n{}\n{}", instruction, CODE_SECTION_HEADER, chunk)
    }
}

/// Instruction for the final call merging per-chunk results
pub fn consolidation_instruction(partial_results: &str) -> String {
    format!(
        "Por favor, resume y consolida la siguiente documentación generada en partes en un único documento coherente. \
Conserva los separadores {}<nombre>{} si existen:\n\n{}",
        FILE_DELIMITER_PREFIX, FILE_DELIMITER_SUFFIX, partial_results
    )
}
