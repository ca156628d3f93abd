//! Deterministic artifact templates
//!
//! Used when the inference service cannot produce artifacts. Templates are
//! keyed by language family; anything unrecognized gets the Python template.

use super::bundle::{ArtifactBundle, ArtifactKind};
use crate::analysis::{LanguageFamily, ProjectDescriptor};

/// Start command in exec form, derived from language and framework
pub fn start_command(descriptor: &ProjectDescriptor) -> Vec<String> {
    let port = descriptor.listen_port;
    let args: Vec<String> = match descriptor.language_family() {
        LanguageFamily::Node => {
            if descriptor.has_framework("express") {
                vec!["node".into(), "server.js".into()]
            } else {
                vec!["npm".into(), "start".into()]
            }
        }
        LanguageFamily::Go | LanguageFamily::Rust => vec!["./app".into()],
        LanguageFamily::Java => vec!["java".into(), "-jar".into(), "app.jar".into()],
        LanguageFamily::Ruby => vec![
            "bundle".into(),
            "exec".into(),
            "rackup".into(),
            "--host".into(),
            "0.0.0.0".into(),
            "--port".into(),
            port.to_string(),
        ],
        LanguageFamily::Php => vec![
            "php".into(),
            "-S".into(),
            format!("0.0.0.0:{}", port),
            "-t".into(),
            "public".into(),
        ],
        LanguageFamily::Python | LanguageFamily::Other => {
            if descriptor.has_framework("fastapi") {
                vec![
                    "uvicorn".into(),
                    "main:app".into(),
                    "--host".into(),
                    "0.0.0.0".into(),
                    "--port".into(),
                    port.to_string(),
                ]
            } else if descriptor.has_framework("django") {
                vec![
                    "gunicorn".into(),
                    "wsgi:application".into(),
                    "--bind".into(),
                    format!("0.0.0.0:{}", port),
                ]
            } else if descriptor.has_framework("flask") {
                vec![
                    "gunicorn".into(),
                    "app:app".into(),
                    "--bind".into(),
                    format!("0.0.0.0:{}", port),
                ]
            } else {
                vec!["python".into(), "app.py".into()]
            }
        }
    };
    args
}

fn exec_form(args: &[String]) -> String {
    let quoted: Vec<String> = args.iter().map(|a| format!("\"{}\"", a)).collect();
    format!("[{}]", quoted.join(", "))
}

fn python_install(descriptor: &ProjectDescriptor) -> &'static str {
    if descriptor.uses_package_manager("poetry") {
        "RUN pip install --no-cache-dir poetry && poetry config virtualenvs.create false && poetry install --no-root --only main"
    } else {
        "RUN pip install --no-cache-dir -r requirements.txt"
    }
}

fn node_install(descriptor: &ProjectDescriptor) -> &'static str {
    if descriptor.uses_package_manager("yarn") {
        "RUN yarn install --frozen-lockfile"
    } else if descriptor.uses_package_manager("pnpm") {
        "RUN corepack enable && pnpm install --frozen-lockfile"
    } else {
        "RUN npm ci"
    }
}

/// Container build file for the descriptor's language
pub fn container_build_file(descriptor: &ProjectDescriptor) -> String {
    let port = descriptor.listen_port;
    let cmd = exec_form(&start_command(descriptor));

    match descriptor.language_family() {
        LanguageFamily::Node => format!(
            "FROM node:20-alpine AS builder\n\
             WORKDIR /app\n\
             COPY package*.json ./\n\
             {install}\n\
             COPY . .\n\
             RUN npm run build --if-present\n\
             \n\
             FROM node:20-alpine\n\
             WORKDIR /app\n\
             ENV NODE_ENV=production PORT={port}\n\
             COPY --from=builder /app ./\n\
             EXPOSE {port}\n\
             HEALTHCHECK --interval=30s --timeout=5s --start-period=60s --retries=3 \\\n  \
             CMD wget --no-verbose --tries=1 --spider http://localhost:{port}/health || exit 1\n\
             CMD {cmd}\n",
            install = node_install(descriptor),
        ),
        LanguageFamily::Go => format!(
            "FROM golang:1.21-alpine AS builder\n\
             WORKDIR /src\n\
             COPY go.mod go.sum* ./\n\
             RUN go mod download\n\
             COPY . .\n\
             RUN CGO_ENABLED=0 GOOS=linux go build -o /out/app .\n\
             \n\
             FROM alpine:3.19\n\
             WORKDIR /app\n\
             RUN apk --no-cache add ca-certificates curl\n\
             COPY --from=builder /out/app ./app\n\
             EXPOSE {port}\n\
             HEALTHCHECK --interval=30s --timeout=5s --start-period=30s --retries=3 \\\n  \
             CMD curl -f http://localhost:{port}/health || exit 1\n\
             CMD {cmd}\n"
        ),
        LanguageFamily::Rust => format!(
            "FROM rust:1.75 AS builder\n\
             WORKDIR /src\n\
             COPY . .\n\
             RUN cargo build --release && cp \"$(find target/release -maxdepth 1 -type f -perm -111 | head -n 1)\" /app-bin\n\
             \n\
             FROM debian:bookworm-slim\n\
             WORKDIR /app\n\
             RUN apt-get update && apt-get install -y --no-install-recommends ca-certificates curl && rm -rf /var/lib/apt/lists/*\n\
             COPY --from=builder /app-bin ./app\n\
             EXPOSE {port}\n\
             HEALTHCHECK --interval=30s --timeout=5s --start-period=30s --retries=3 \\\n  \
             CMD curl -f http://localhost:{port}/health || exit 1\n\
             CMD {cmd}\n"
        ),
        LanguageFamily::Java => format!(
            "FROM eclipse-temurin:17-jdk AS builder\n\
             WORKDIR /src\n\
             COPY . .\n\
             RUN if [ -f mvnw ]; then ./mvnw -q package -DskipTests; \\\n    \
             elif [ -f gradlew ]; then ./gradlew build -x test; \\\n    \
             else echo \"no build wrapper found\" && exit 1; fi && \\\n    \
             cp \"$(ls target/*.jar build/libs/*.jar 2>/dev/null | grep -v plain | head -n 1)\" /app.jar\n\
             \n\
             FROM eclipse-temurin:17-jre\n\
             WORKDIR /app\n\
             COPY --from=builder /app.jar ./app.jar\n\
             EXPOSE {port}\n\
             HEALTHCHECK --interval=30s --timeout=5s --start-period=90s --retries=3 \\\n  \
             CMD wget --no-verbose --tries=1 --spider http://localhost:{port}/health || exit 1\n\
             CMD {cmd}\n"
        ),
        LanguageFamily::Ruby => format!(
            "FROM ruby:3.2-slim\n\
             WORKDIR /app\n\
             COPY Gemfile Gemfile.lock* ./\n\
             RUN bundle install --without development test\n\
             COPY . .\n\
             EXPOSE {port}\n\
             CMD {cmd}\n"
        ),
        LanguageFamily::Php => format!(
            "FROM php:8.2-cli\n\
             WORKDIR /app\n\
             COPY --from=composer:2 /usr/bin/composer /usr/bin/composer\n\
             COPY . .\n\
             RUN composer install --no-dev --optimize-autoloader\n\
             EXPOSE {port}\n\
             CMD {cmd}\n"
        ),
        LanguageFamily::Python | LanguageFamily::Other => format!(
            "FROM python:3.11-slim\n\
             WORKDIR /app\n\
             ENV PYTHONUNBUFFERED=1 PORT={port}\n\
             RUN apt-get update && apt-get install -y --no-install-recommends curl && rm -rf /var/lib/apt/lists/*\n\
             COPY . .\n\
             {install}\n\
             EXPOSE {port}\n\
             HEALTHCHECK --interval=30s --timeout=5s --start-period=60s --retries=3 \\\n  \
             CMD curl -f http://localhost:{port}/health || exit 1\n\
             CMD {cmd}\n",
            install = python_install(descriptor),
        ),
    }
}

pub fn infra_definition(descriptor: &ProjectDescriptor) -> String {
    format!(
        r#"resource "aws_ecs_task_definition" "app" {{
  family                   = "deploybox-app"
  requires_compatibilities = ["FARGATE"]
  network_mode             = "awsvpc"
  cpu                      = var.cpu
  memory                   = var.memory
  execution_role_arn       = var.execution_role_arn

  container_definitions = jsonencode([{{
    name         = "app"
    image        = "${{var.ecr_repository_url}}:${{var.image_tag}}"
    essential    = true
    portMappings = [{{ containerPort = {port}, protocol = "tcp" }}]
    healthCheck = {{
      command  = ["CMD-SHELL", "curl -f http://localhost:{port}/health || exit 1"]
      interval = 30
      timeout  = 5
      retries  = 3
    }}
  }}])
}}
"#,
        port = descriptor.listen_port
    )
}

pub fn process_manifest(descriptor: &ProjectDescriptor) -> String {
    format!(
        "version: 0.0\n\
         Resources:\n  \
         - TargetService:\n      \
         Type: AWS::ECS::Service\n      \
         Properties:\n        \
         TaskDefinition: <TASK_DEFINITION>\n        \
         LoadBalancerInfo:\n          \
         ContainerName: \"app\"\n          \
         ContainerPort: {}\n        \
         PlatformVersion: \"LATEST\"\n",
        descriptor.listen_port
    )
}

pub fn build_manifest() -> String {
    "version: 0.2\n\
     phases:\n  \
     pre_build:\n    \
     commands:\n      \
     - aws ecr get-login-password --region $AWS_DEFAULT_REGION | docker login --username AWS --password-stdin $REGISTRY\n  \
     build:\n    \
     commands:\n      \
     - docker build -t $REGISTRY/$IMAGE_REPOSITORY:$IMAGE_TAG .\n  \
     post_build:\n    \
     commands:\n      \
     - docker push $REGISTRY/$IMAGE_REPOSITORY:$IMAGE_TAG\n"
        .to_string()
}

pub fn release_notes(descriptor: &ProjectDescriptor) -> String {
    format!(
        "# Deployment notes\n\n\
         Template artifacts generated for a {} project ({}). \
         Review and customize them before relying on this deployment.\n\n\
         - Container port: {}\n\
         - Resources: {} CPU units / {} MiB\n",
        descriptor.primary_language,
        descriptor.runtime_label,
        descriptor.listen_port,
        descriptor.resource_tier.cpu_units(),
        descriptor.resource_tier.memory_mib()
    )
}

/// Full template bundle, without infra variables
pub fn fallback_bundle(descriptor: &ProjectDescriptor) -> ArtifactBundle {
    ArtifactBundle::new()
        .with(ArtifactKind::ContainerBuildFile, container_build_file(descriptor))
        .with(ArtifactKind::InfraDefinition, infra_definition(descriptor))
        .with(ArtifactKind::ProcessManifest, process_manifest(descriptor))
        .with(ArtifactKind::BuildManifest, build_manifest())
        .with(ArtifactKind::ReleaseNotes, release_notes(descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Confidence, ResourceTier};

    fn descriptor(language: &str, framework: Option<&str>, port: u16) -> ProjectDescriptor {
        ProjectDescriptor {
            primary_language: language.to_string(),
            primary_framework: framework.map(str::to_string),
            runtime_label: format!("{} runtime", language),
            listen_port: port,
            resource_tier: ResourceTier::Medium,
            database_requirement: None,
            confidence: Confidence::Low,
            package_managers: vec![],
        }
    }

    #[test]
    fn test_start_commands() {
        assert_eq!(
            start_command(&descriptor("Python", Some("FastAPI"), 9000)),
            vec!["uvicorn", "main:app", "--host", "0.0.0.0", "--port", "9000"]
        );
        assert_eq!(
            start_command(&descriptor("Python", Some("Django"), 8000))[0],
            "gunicorn"
        );
        assert_eq!(start_command(&descriptor("JavaScript", None, 3000)), vec!["npm", "start"]);
        assert_eq!(start_command(&descriptor("Go", None, 8080)), vec!["./app"]);
        assert_eq!(
            start_command(&descriptor("Java", None, 8080)),
            vec!["java", "-jar", "app.jar"]
        );
    }

    #[test]
    fn test_templates_use_port_and_colon_images() {
        for language in ["Python", "JavaScript", "Go", "Rust", "Java", "Ruby", "PHP", "Elixir"] {
            let text = container_build_file(&descriptor(language, None, 4321));
            assert!(text.contains("EXPOSE 4321"), "{}", language);
            let from_lines: Vec<&str> = text.lines().filter(|l| l.starts_with("FROM ")).collect();
            assert!(!from_lines.is_empty());
            for line in from_lines {
                let image = line.split_whitespace().nth(1).unwrap();
                assert!(image.contains(':'), "{} has untagged image {}", language, image);
            }
        }
    }

    #[test]
    fn test_unknown_language_uses_python_template() {
        let text = container_build_file(&descriptor("Elixir", None, 8000));
        assert!(text.starts_with("FROM python:3.11-slim"));
    }

    #[test]
    fn test_fallback_bundle_contents() {
        let bundle = fallback_bundle(&descriptor("Go", None, 8080));
        assert!(bundle.contains(ArtifactKind::ContainerBuildFile));
        assert!(bundle.contains(ArtifactKind::InfraDefinition));
        assert!(bundle.contains(ArtifactKind::ProcessManifest));
        assert!(bundle.contains(ArtifactKind::BuildManifest));
        assert!(bundle.contains(ArtifactKind::ReleaseNotes));
        assert!(!bundle.contains(ArtifactKind::InfraVariables));
        assert!(bundle.get(ArtifactKind::ProcessManifest).unwrap().contains("ContainerPort: 8080"));
    }
}
