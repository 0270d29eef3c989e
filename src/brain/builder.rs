// RequestBuilder - chainable builder for GenerateContentRequest

use super::{
    Content, FunctionCall, FunctionResponse, GenerateContentRequest, Part, Role, Tool,
    ToolDefinition,
};

pub struct RequestBuilder {
    system: Option<String>,
    contents: Vec<Content>,
    tools: Vec<ToolDefinition>,
    bare: bool,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            system: None,
            contents: Vec::new(),
            tools: Vec::new(),
            bare: false,
        }
    }

    /// Omit roles, matching the minimal single-prompt body
    pub fn bare(mut self) -> Self {
        self.bare = true;
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn user_text(mut self, text: impl Into<String>) -> Self {
        self.contents.push(Content::user_text(text));
        self
    }

    pub fn model_function_call(mut self, name: impl Into<String>, args: serde_json::Value) -> Self {
        self.contents.push(Content {
            role: Some(Role::Model),
            parts: vec![Part {
                function_call: Some(FunctionCall {
                    name: name.into(),
                    args,
                }),
                ..Default::default()
            }],
        });
        self
    }

    pub fn user_function_response(
        mut self,
        name: impl Into<String>,
        response: serde_json::Value,
    ) -> Self {
        self.contents.push(Content {
            role: Some(Role::User),
            parts: vec![Part {
                function_response: Some(FunctionResponse {
                    name: name.into(),
                    response,
                }),
                ..Default::default()
            }],
        });
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn build(self) -> Result<GenerateContentRequest, &'static str> {
        if self.contents.is_empty() {
            return Err("contents cannot be empty");
        }

        // Validate: first turn must be user role
        if self.contents.first().and_then(|c| c.role) != Some(Role::User) {
            return Err("first content must have user role");
        }

        let mut contents = self.contents;
        if self.bare {
            for content in &mut contents {
                content.role = None;
            }
        }

        Ok(GenerateContentRequest {
            contents,
            system_instruction: self.system.map(|text| Content {
                role: None,
                parts: vec![Part::text(text)],
            }),
            tools: if self.tools.is_empty() {
                None
            } else {
                Some(vec![Tool {
                    function_declarations: self.tools,
                }])
            },
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_prompt() {
        let request = RequestBuilder::new().bare().user_text("ping").build().unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"contents": [{"parts": [{"text": "ping"}]}]})
        );
    }

    #[test]
    fn test_tool_round_trip_turns() {
        let request = RequestBuilder::new()
            .system("be brief")
            .user_text("what is in a.txt?")
            .model_function_call("read_file", json!({"path": "a.txt"}))
            .user_function_response("read_file", json!({"output": "hello"}))
            .tools(vec![ToolDefinition {
                name: "read_file".to_string(),
                description: "Read a file".to_string(),
                parameters: json!({"type": "object"}),
            }])
            .build()
            .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"].as_array().unwrap().len(), 3);
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["contents"][1]["parts"][0]["functionCall"]["name"], "read_file");
        assert_eq!(value["contents"][2]["parts"][0]["functionResponse"]["response"]["output"], "hello");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(value["tools"][0]["functionDeclarations"][0]["name"], "read_file");
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(RequestBuilder::new().build().is_err());
    }
}
