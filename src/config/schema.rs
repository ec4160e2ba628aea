use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "target": {
                "type": "object",
                "required": ["url"],
                "properties": {
                    "url": { "type": "string", "format": "uri" },
                    "protocol": { "type": "string", "enum": ["http", "websocket"] },
                    "message_field": { "type": "string" },
                    "auth": {
                        "type": "object",
                        "properties": {
                            "kind": { "type": "string", "enum": ["none", "bearer", "apikey", "basic"] },
                            "header_name": { "type": "string" },
                            "token": { "type": "string" },
                            "username": { "type": "string" },
                            "password": { "type": "string" }
                        }
                    },
                    "request_timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "recon": {
                "type": "object",
                "properties": {
                    "depth": { "type": "string", "enum": ["shallow", "standard", "aggressive"] },
                    "forbidden_keywords": { "type": "array", "items": { "type": "string" } },
                    "special_instructions": { "type": "string" },
                    "sim_dedup_threshold": { "type": "number", "minimum": 0, "maximum": 1 },
                    "min_observations_per_category": { "type": "integer", "minimum": 0 },
                    "min_tools": { "type": "integer", "minimum": 0 },
                    "consecutive_error_limit": { "type": "integer", "minimum": 1 }
                }
            },
            "scan": {
                "type": "object",
                "properties": {
                    "approach": { "type": "string", "enum": ["quick", "standard", "thorough"] },
                    "max_concurrent_probes": { "type": "integer", "minimum": 1 },
                    "max_concurrent_generations": { "type": "integer", "minimum": 1 },
                    "planning_timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "exploit": {
                "type": "object",
                "properties": {
                    "max_iterations": { "type": "integer", "minimum": 1 },
                    "success_scorers": { "type": "array", "items": { "type": "string" } },
                    "success_threshold": { "type": "number", "minimum": 0, "maximum": 1 },
                    "initial_framing_hint": { "type": "string" },
                    "initial_chain": { "type": "array", "items": { "type": "string" } },
                    "payloads_per_iteration": { "type": "integer", "minimum": 1 },
                    "iteration_deadline_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "kb": {
                "type": "object",
                "properties": {
                    "min_similarity": { "type": "number", "minimum": 0, "maximum": 1 },
                    "top_k": { "type": "integer", "minimum": 1 },
                    "override_confidence": { "type": "number", "minimum": 0, "maximum": 1 },
                    "embedding_dim": { "type": "integer", "minimum": 1 }
                }
            },
            "llm": {
                "type": "object",
                "properties": {
                    "reasoning": { "$ref": "#/$defs/llm_role" },
                    "scoring": { "$ref": "#/$defs/llm_role" },
                    "reconnaissance": { "$ref": "#/$defs/llm_role" },
                    "reasoning_timeout_secs": { "type": "integer", "minimum": 1 },
                    "schema_retries": { "type": "integer", "minimum": 0 }
                }
            },
            "scheduler": {
                "type": "object",
                "properties": {
                    "requests_per_second": { "type": "number", "minimum": 0 },
                    "burst": { "type": "integer", "minimum": 1 }
                }
            },
            "output": {
                "type": "object",
                "properties": {
                    "directory": { "type": "string" },
                    "format": { "type": "string" }
                }
            }
        },
        "$defs": {
            "llm_role": {
                "type": "object",
                "properties": {
                    "provider": { "type": "string" },
                    "model": { "type": "string" },
                    "api_key": { "type": "string" },
                    "base_url": { "type": "string" }
                }
            }
        }
    })
});
