//! config 模块测试
