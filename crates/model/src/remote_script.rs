/// `{head_text, body_text, input_file_path, result_file_path}` (§3.1). Head
/// is built by string interpolation from a fixed set of named parameters;
/// body is literal template text. Produced exclusively by the script
/// composer (L2) — nothing else is permitted to construct one, since the
/// injection-safety property (§8 #3) depends on every dynamic string having
/// passed through the composer's escaping rule on the way in.
#[derive(Debug, Clone)]
pub struct RemoteScript {
    pub head_text: String,
    pub body_text: String,
    pub input_file_path: Option<String>,
    pub result_file_path: String,
}

impl RemoteScript {
    /// The full Ruby source sent to `load '<scriptPath>'` (§4.1 step 4):
    /// the interpolated head followed by the literal body.
    pub fn full_source(&self) -> String {
        format!("{}\n{}", self.head_text, self.body_text)
    }
}
