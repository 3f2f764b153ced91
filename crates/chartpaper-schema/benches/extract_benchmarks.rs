use criterion::{criterion_group, criterion_main, Criterion};
use std::fmt::Write;

fn rendered_manifest(services: usize) -> String {
    let mut out = String::new();
    for i in 0..services {
        write!(
            out,
            r#"---
apiVersion: v1
kind: Service
metadata:
  name: svc-{i}
spec:
  ports:
  - port: {port}
    targetPort: http
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: app-{i}
spec:
  template:
    spec:
      containers:
      - name: app
        image: "registry.local:5000/team/app-{i}:1.{i}.0"
        imagePullPolicy: IfNotPresent
---
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: ing-{i}
spec:
  rules:
  - http:
      paths:
      - path: /app-{i}
        pathType: Prefix
"#,
            port = 8000 + i
        )
        .unwrap();
    }
    out
}

fn bench_extract_small(c: &mut Criterion) {
    let manifest = rendered_manifest(3);
    c.bench_function("extract_manifest_3_services", |b| {
        b.iter(|| chartpaper_schema::extract_manifest_facts(&manifest));
    });
}

fn bench_extract_large(c: &mut Criterion) {
    let manifest = rendered_manifest(200);
    c.bench_function("extract_manifest_200_services", |b| {
        b.iter(|| chartpaper_schema::extract_manifest_facts(&manifest));
    });
}

fn bench_parse_chart_yaml(c: &mut Criterion) {
    let yaml = "apiVersion: v2\nname: redis\nversion: 18.6.1\ndependencies:\n  - name: common\n    version: 2.x.x\n    repository: oci://registry-1.docker.io/bitnamicharts\n";
    c.bench_function("parse_chart_yaml", |b| {
        b.iter(|| chartpaper_schema::parse_chart_yaml(yaml).unwrap());
    });
}

criterion_group!(
    benches,
    bench_extract_small,
    bench_extract_large,
    bench_parse_chart_yaml
);
criterion_main!(benches);
