#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    file: TestFile,
    request: TestRequest,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, file: TestFile, request: TestRequest) -> Self {
        Self { name, group, file, request }
    }

    pub fn small(name: &'static str, file: TestFile, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Small, file, request)
    }

    pub fn normal(name: &'static str, file: TestFile, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Normal, file, request)
    }

    pub fn large(name: &'static str, file: TestFile, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Large, file, request)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    pub fn file_name(&self) -> &'static str {
        self.file().file_name
    }

    pub fn request(&self) -> &TestRequest {
        &self.request
    }
}

/// A route table description, one `METHOD /path` per line, `#` starts a comment line.
#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    /// `(method, path)` pairs in file order.
    pub fn routes(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        self.content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(' '))
            .map(|(method, path)| (method, path.trim()))
    }
}

/// The request resolved in a benchmark iteration.
#[derive(Debug, Copy, Clone)]
pub struct TestRequest {
    method: &'static str,
    path: &'static str,
}

impl TestRequest {
    pub const fn new(method: &'static str, path: &'static str) -> Self {
        Self { method, path }
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}
